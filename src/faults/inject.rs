//! Scenario dispatch and response sculpting.
//!
//! The catch-all handler lands here: resolve the path to a template key,
//! walk the scenario list for the first predicate match, gate through the
//! circuit breaker, rotate the response cursor, and apply probability,
//! delay, template rendering, headers, and gzip to produce the response.

use std::io::Write;
use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::Rng;

use crate::faults::echo;
use crate::faults::template::{has_template_syntax, TemplateData};
use crate::http::request::RequestContext;
use crate::http::server::AppState;
use crate::observability::metrics::FaultType;
use crate::resilience::circuit_breaker;
use crate::scenario::matching::matches_request;
use crate::scenario::path;
use crate::scenario::spec::Scenario;

/// Entry point for all traffic not bound to a fixed route.
pub async fn dispatch(state: &AppState, mut ctx: RequestContext) -> Response {
    let Some(resolved) = path::resolve(&state.registry, &ctx.path, &ctx.method) else {
        tracing::debug!(path = %ctx.path, method = %ctx.method, "no scenario for request");
        return (StatusCode::NOT_FOUND, "Scenario not found for path/method").into_response();
    };
    ctx.path_vars = resolved.vars;

    let Some(scenario) = resolved
        .scenarios
        .iter()
        .find(|s| matches_request(s, &ctx))
    else {
        // Predicates filtered out every candidate; mirror the request.
        return echo::respond(&state.config, &ctx).await;
    };

    respond_with_scenario(state, &ctx, &resolved.template, scenario).await
}

/// Serve one scenario response for an admitted request.
pub async fn respond_with_scenario(
    state: &AppState,
    ctx: &RequestContext,
    template_path: &str,
    scenario: &Scenario,
) -> Response {
    if scenario.breaker_armed() && !circuit_breaker::admit(scenario) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable (Circuit Breaker Open)",
        )
            .into_response();
    }

    let len = scenario.responses.len();
    if len == 0 {
        // Rejected at the control-API boundary; guard against a bad preload.
        return (StatusCode::INTERNAL_SERVER_ERROR, "Scenario has no responses").into_response();
    }

    // Advisory rotation: concurrent requests may observe the same index.
    let idx = scenario.cursor.load(Ordering::Relaxed) as usize % len;
    scenario
        .cursor
        .store(((idx + 1) % len) as u32, Ordering::Relaxed);
    let response = &scenario.responses[idx];

    // Probability gate: a miss falls through to echo and counts as a
    // success for the breaker.
    if response.probability > 0.0
        && response.probability < 1.0
        && rand::thread_rng().gen::<f64>() > response.probability
    {
        let echoed = echo::respond(&state.config, ctx).await;
        if scenario.breaker_armed() {
            circuit_breaker::record(scenario, true);
        }
        return echoed;
    }

    let delay = response.effective_delay();
    if let Some(delay) = delay {
        state.metrics.record_fault(FaultType::Delay, template_path);
        tokio::time::sleep(delay).await;
    }

    let is_failure = response.status >= 500;
    if response.status >= 400 {
        state.metrics.record_fault(FaultType::HttpError, template_path);
    }
    if scenario.breaker_armed() {
        circuit_breaker::record(scenario, !is_failure);
    }

    let fault_type = if delay.is_some() {
        "delay"
    } else if response.status >= 400 {
        "error"
    } else {
        "none"
    };

    let raw_body = response.body.as_str();
    let body = if has_template_syntax(raw_body) {
        let data = TemplateData::from_request(ctx, &state.config.hostname, fault_type);
        match state.templates.render(raw_body, &data) {
            Ok(rendered) => rendered,
            Err(err) => {
                tracing::error!(path = %ctx.path, error = %err, "template rendering failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error (Template)",
                )
                    .into_response();
            }
        }
    } else {
        raw_body.to_string()
    };

    let mut bytes = body.into_bytes();
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let mut out = Response::new(Body::empty());
    *out.status_mut() = status;

    for (name, value) in &response.headers {
        match (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().insert(name, value);
            }
            _ => {
                tracing::warn!(header = %name, "skipping invalid scenario response header");
            }
        }
    }

    let client_accepts_gzip = ctx
        .header("accept-encoding")
        .is_some_and(|v| v.contains("gzip"));
    if response.gzip && client_accepts_gzip {
        match gzip_encode(&bytes) {
            Ok(compressed) => {
                bytes = compressed;
                out.headers_mut().insert(
                    header::CONTENT_ENCODING,
                    HeaderValue::from_static("gzip"),
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "gzip encoding failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                    .into_response();
            }
        }
    }

    *out.body_mut() = Body::from(bytes);
    out
}

fn gzip_encode(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}
