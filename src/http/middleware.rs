//! Middleware chain wrapping every request.
//!
//! Order, outermost first: request ID → history/metrics recording → CORS →
//! rate limiting. The recording middleware buffers the request body through
//! a bounded read and restores it for downstream handlers; the final status
//! is observed on the response after the inner service returns.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::history::RequestRecord;
use crate::http::request::{RequestId, X_REQUEST_ID};
use crate::http::server::AppState;

/// Snippet length stored in history when body logging is off.
const SNIPPET_LIMIT: usize = 256;

/// Adopt the client's `X-Request-ID` or assign the next counter value, and
/// echo the ID back on the response.
pub async fn request_id(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| (state.request_seq.fetch_add(1, Ordering::Relaxed) + 1).to_string());

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Observe the inflight gauge, buffer the body through a bounded read,
/// time the handler, and append a history record once it completes.
pub async fn record(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let started_at = Utc::now();
    state.metrics.inc_inflight();

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.config.max_body_size).await {
        Ok(bytes) => bytes,
        Err(err) => {
            // Oversized bodies are logged, not fatal; the handler proceeds
            // with an empty body.
            tracing::warn!(
                limit = state.config.max_body_size,
                error = %err,
                "failed to buffer request body"
            );
            Bytes::new()
        }
    };

    let id = parts
        .extensions
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().unwrap_or_default().to_string();
    let headers = crate::http::request::multi_headers(&parts.headers);

    if state.config.log_headers {
        tracing::debug!(method = %method, path = %path, headers = ?headers, "request headers");
    }

    let request = Request::from_parts(parts, Body::from(bytes.clone()));
    let response = next.run(request).await;

    state.metrics.dec_inflight();
    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    state
        .metrics
        .observe_duration(&path, &method, status, elapsed.as_secs_f64());

    let mut snippet = String::from_utf8_lossy(&bytes).into_owned();
    if !state.config.log_body && snippet.len() > SNIPPET_LIMIT {
        let mut cut = SNIPPET_LIMIT;
        while !snippet.is_char_boundary(cut) {
            cut -= 1;
        }
        snippet.truncate(cut);
        snippet.push_str("...");
    }

    state.history.record(RequestRecord {
        id,
        timestamp: started_at,
        method: method.clone(),
        path: path.clone(),
        query,
        remote_addr: remote.to_string(),
        headers,
        body_snippet: snippet,
        status_code: status,
    });

    if state.config.log_requests {
        tracing::info!(
            method = %method,
            path = %path,
            status,
            elapsed = ?elapsed,
            "request completed"
        );
    }

    response
}

/// Permissive CORS handling; answers any OPTIONS request directly.
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.enable_cors {
        return next.run(request).await;
    }

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("POST, GET, OPTIONS, PUT, DELETE"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(
            "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization, \
             X-Echo-Delay, X-Echo-Status, X-Echo-Headers, X-Echo-Body",
        ),
    );
    response
}

/// Global rate limiting: one token per request, 429 when the bucket is dry.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if !limiter.try_acquire() {
            tracing::warn!(path = %request.uri().path(), "rate limit exceeded");
            return (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
        }
    }
    next.run(request).await
}

/// A token bucket shared by every request.
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    capacity: f64,
    refill_rate: f64,
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl RateLimiter {
    /// Bucket sized to one second of traffic, matching the configured rate.
    pub fn new(requests_per_second: f64) -> Self {
        let capacity = requests_per_second.max(1.0);
        Self {
            bucket: Mutex::new(TokenBucket {
                tokens: capacity,
                last_update: Instant::now(),
            }),
            capacity,
            refill_rate: requests_per_second,
        }
    }

    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();

        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
