//! Health reporting with pluggable named checks.
//!
//! Any check returning an error flips the endpoint to 503; the JSON body
//! always carries per-check results plus uptime and host details.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

/// A named health probe. Returns a human-readable status message or an
/// error description.
pub type Checker = Box<dyn Fn() -> Result<String, String> + Send + Sync>;

/// Health check registry for the server.
pub struct Health {
    checkers: Mutex<Vec<(String, Checker)>>,
    started_at: Instant,
    hostname: String,
}

impl Health {
    pub fn new(hostname: &str) -> Self {
        Self {
            checkers: Mutex::new(Vec::new()),
            started_at: Instant::now(),
            hostname: hostname.to_string(),
        }
    }

    /// Register a named check.
    pub fn add_check(&self, name: &str, checker: Checker) {
        self.checkers
            .lock()
            .expect("health mutex poisoned")
            .push((name.to_string(), checker));
    }

    /// Run all checks and render the health document.
    pub fn respond(&self) -> Response {
        let mut checks = BTreeMap::new();
        let mut status = StatusCode::OK;

        for (name, check) in self.checkers.lock().expect("health mutex poisoned").iter() {
            match check() {
                Ok(message) => {
                    checks.insert(name.clone(), message);
                }
                Err(err) => {
                    status = StatusCode::SERVICE_UNAVAILABLE;
                    checks.insert(name.clone(), format!("error: {err}"));
                }
            }
        }

        let body = json!({
            "status": status.canonical_reason().unwrap_or("Unknown"),
            "timestamp": Utc::now().to_rfc3339(),
            "uptime": format!("{:?}", self.started_at.elapsed()),
            "checks": checks,
            "system": {
                "parallelism": std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
                "version": env!("CARGO_PKG_VERSION"),
                "os": std::env::consts::OS,
                "arch": std::env::consts::ARCH,
                "hostname": self.hostname,
            },
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_with_passing_checks() {
        let health = Health::new("test-host");
        health.add_check("ping", Box::new(|| Ok("pong".to_string())));
        let response = health.respond();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn any_failing_check_means_503() {
        let health = Health::new("test-host");
        health.add_check("ping", Box::new(|| Ok("pong".to_string())));
        health.add_check("db", Box::new(|| Err("connection refused".to_string())));
        let response = health.respond();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
