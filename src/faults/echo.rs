//! Echo handler: mirrors the request back as JSON.
//!
//! This is the default behavior for unmatched traffic and the landing spot
//! for probability-gate misses. `X-Echo-*` headers drive ad-hoc faults
//! without registering a scenario; two global knobs (delay, chaos) apply to
//! every echo response.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::config::schema::{ServerConfig, MAX_GENERATED_BODY};
use crate::http::request::{canonical_header_name, RequestContext};

const SET_HEADER_PREFIX: &str = "x-echo-set-header-";

/// JSON shape of the default echo dump.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EchoResponse {
    timestamp: DateTime<Utc>,
    method: String,
    path: String,
    query: HashMap<String, Vec<String>>,
    headers: HashMap<String, Vec<String>>,
    body: String,
    remote_addr: String,
    hostname: String,
}

/// Serve the echo response for a captured request.
pub async fn respond(config: &ServerConfig, ctx: &RequestContext) -> Response {
    // Global pre-handler delay.
    if !config.echo_delay.is_zero() {
        tokio::time::sleep(config.echo_delay).await;
    }

    // Global chaos: a configured fraction of echoes turn into 500s.
    if config.echo_chaos_probability > 0.0
        && rand::thread_rng().gen::<f64>() < config.echo_chaos_probability
    {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Global Chaos Injection").into_response();
    }

    // Client-driven delay: fixed wins over the latency range form.
    if let Some(delay) = ctx.header("x-echo-delay") {
        if let Ok(d) = humantime::parse_duration(delay) {
            tokio::time::sleep(d).await;
        }
    } else if let Some(latency) = ctx.header("x-echo-latency") {
        if let Some(d) = parse_latency(latency) {
            tokio::time::sleep(d).await;
        }
    }

    let status = ctx
        .header("x-echo-status")
        .and_then(|s| s.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let mut response_headers = Vec::new();
    if let Some(raw) = ctx.header("x-echo-headers") {
        if let Ok(map) = serde_json::from_str::<HashMap<String, String>>(raw) {
            response_headers.extend(map);
        }
    }
    for (name, value) in &ctx.headers {
        if let Some(rest) = name.as_str().strip_prefix(SET_HEADER_PREFIX) {
            if let Ok(v) = value.to_str() {
                response_headers.push((canonical_header_name(rest), v.to_string()));
            }
        }
    }

    // Client-specified body wins over the generated-size form.
    let custom_body: Option<Vec<u8>> = if let Some(body) = ctx.header("x-echo-body") {
        Some(body.as_bytes().to_vec())
    } else {
        ctx.header("x-echo-response-size")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&size| size > 0)
            .map(|size| vec![b'A'; size.min(MAX_GENERATED_BODY)])
    };

    if let Some(body) = custom_body {
        return build_response(status, &response_headers, None, Body::from(body));
    }

    let dump = EchoResponse {
        timestamp: Utc::now(),
        method: ctx.method.clone(),
        path: ctx.path.clone(),
        query: ctx.query_multi(),
        headers: ctx.headers_multi(),
        body: ctx.body_string(),
        remote_addr: ctx.remote_addr.clone(),
        hostname: config.hostname.clone(),
    };
    let body = serde_json::to_vec(&dump).unwrap_or_default();
    build_response(
        status,
        &response_headers,
        Some("application/json"),
        Body::from(body),
    )
}

/// Parse `X-Echo-Latency`: either a range (`100ms-500ms`) or one value.
fn parse_latency(raw: &str) -> Option<Duration> {
    if let Some((min, max)) = raw.split_once('-') {
        let min = humantime::parse_duration(min.trim()).ok()?;
        let max = humantime::parse_duration(max.trim()).ok()?;
        if max > min {
            let span = (max - min).as_nanos() as u64;
            let jitter = rand::thread_rng().gen_range(0..=span);
            return Some(min + Duration::from_nanos(jitter));
        }
        return Some(min);
    }
    humantime::parse_duration(raw.trim()).ok()
}

fn build_response(
    status: StatusCode,
    headers: &[(String, String)],
    content_type: Option<&str>,
    body: Body,
) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    // The JSON dump always declares itself, even past client-driven headers.
    if let Some(ct) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
        response
            .headers_mut()
            .insert(axum::http::header::CONTENT_TYPE, ct);
    }
    response
}
