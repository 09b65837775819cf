//! Control API: scenario registration, history, metrics reset, replay.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::validation::validate_scenario;
use crate::http::server::AppState;
use crate::scenario::spec::Scenario;

/// `POST /scenario`: body is a single scenario object or an array.
pub async fn add_scenario(State(state): State<AppState>, body: Bytes) -> Response {
    let scenarios: Vec<Scenario> = match serde_json::from_slice::<Vec<Scenario>>(&body) {
        Ok(list) => list,
        Err(_) => match serde_json::from_slice::<Scenario>(&body) {
            Ok(single) => vec![single],
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Invalid scenario JSON: {err}"),
                )
                    .into_response();
            }
        },
    };

    for scenario in &scenarios {
        if let Err(errors) = validate_scenario(scenario) {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid scenario: {joined}"),
            )
                .into_response();
        }
    }

    let count = scenarios.len();
    for scenario in scenarios {
        tracing::info!(path = %scenario.path, method = %scenario.method, "scenario registered");
        state.registry.add(scenario);
    }
    tracing::debug!(count, total_keys = state.registry.len(), "scenario table updated");

    (StatusCode::OK, "Scenarios added.").into_response()
}

/// `GET /history`: the buffer in its simplified JSON shape.
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<Value>> {
    let mut entries = Vec::new();
    for record in state.history.snapshot() {
        let user_agent = record
            .headers
            .get("User-Agent")
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default();

        let mut entry = json!({
            "id": record.id,
            "time": record.timestamp.format("%H:%M:%S").to_string(),
            "method": record.method,
            "path": record.path,
            "query": record.query,
            "status": record.status_code,
            "userAgent": user_agent,
        });

        if state.config.log_body && !record.body_snippet.is_empty() {
            // Structured bodies are inlined as JSON, opaque ones as strings.
            let body = serde_json::from_str::<Value>(&record.body_snippet)
                .unwrap_or(Value::String(record.body_snippet.clone()));
            entry["body"] = body;
        }

        entries.push(entry);
    }
    Json(entries)
}

/// `POST /api/control/reset-history`: empty the buffer.
pub async fn reset_history(State(state): State<AppState>) -> Response {
    state.history.clear();
    (StatusCode::OK, "Request history cleared.").into_response()
}

/// `POST /api/control/reset-metrics`: reset the fault counter only.
pub async fn reset_metrics(State(state): State<AppState>) -> Response {
    state.metrics.reset_faults();
    (StatusCode::OK, "Injected fault metrics reset.").into_response()
}

#[derive(Debug, Deserialize)]
struct ReplayRequest {
    id: String,
    #[serde(default)]
    target: Option<String>,
}

/// `POST /replay`: rebuild a recorded request and issue it at the target
/// (default: this server), streaming the upstream response back.
pub async fn replay(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: ReplayRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid request body").into_response(),
    };

    let Some(record) = state.history.find(&request.id) else {
        return (StatusCode::NOT_FOUND, "Request ID not found").into_response();
    };

    let target = request.target.unwrap_or_else(|| {
        let scheme = if state.config.enable_tls { "https" } else { "http" };
        let host = headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("127.0.0.1:{}", state.config.port));
        format!("{scheme}://{host}")
    });
    let url = format!("{}{}", target.trim_end_matches('/'), record.path);

    let method = reqwest::Method::from_bytes(record.method.as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let mut upstream = state
        .replay_client
        .request(method, &url)
        .body(record.body_snippet.clone());
    for (name, values) in &record.headers {
        if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        for value in values {
            upstream = upstream.header(name.as_str(), value.as_str());
        }
    }

    tracing::info!(id = %record.id, url = %url, "replaying recorded request");
    match upstream.send().await {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::OK);
            let mut out = Response::new(Body::from_stream(response.bytes_stream()));
            *out.status_mut() = status;
            out
        }
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            format!("Replay failed: {err}"),
        )
            .into_response(),
    }
}
