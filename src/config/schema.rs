//! Configuration schema definitions.
//!
//! The root [`ServerConfig`] is deserializable from YAML and overridable
//! from environment variables (see `loader.rs`). All fields carry defaults
//! so a minimal deployment needs no configuration at all.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the mock server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub port: u16,

    /// Serve TLS instead of plaintext.
    #[serde(rename = "enableTLS")]
    pub enable_tls: bool,

    /// Path to the PEM certificate file (TLS only).
    pub cert_file: String,

    /// Path to the PEM private key file (TLS only).
    pub key_file: String,

    /// Enable permissive CORS handling.
    #[serde(rename = "enableCORS")]
    pub enable_cors: bool,

    /// Log one line per completed request.
    pub log_requests: bool,

    /// Include request headers in the per-request debug log.
    pub log_headers: bool,

    /// Store full request bodies in history (otherwise truncated to 256 bytes).
    pub log_body: bool,

    /// Maximum request body size buffered per request, in bytes.
    pub max_body_size: usize,

    /// Hostname reported by /echo, /health, and the template context.
    pub hostname: String,

    /// Global token-bucket rate in requests per second; 0 disables limiting.
    #[serde(rename = "rateLimitPerS")]
    pub rate_limit_rps: f64,

    /// Capacity of the request-history FIFO.
    pub history_size: usize,

    /// Delay applied to every /echo response.
    #[serde(with = "humantime_serde")]
    pub echo_delay: Duration,

    /// Probability that /echo answers 500 instead of echoing.
    #[serde(rename = "echoChaosProbability")]
    pub echo_chaos_probability: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            enable_tls: false,
            cert_file: "cert.pem".to_string(),
            key_file: "key.pem".to_string(),
            enable_cors: true,
            log_requests: true,
            log_headers: false,
            log_body: true,
            max_body_size: 1024 * 1024,
            hostname: "localhost".to_string(),
            rate_limit_rps: 0.0,
            history_size: 100,
            echo_delay: Duration::ZERO,
            echo_chaos_probability: 0.0,
        }
    }
}

/// Upper bound for bodies generated by `X-Echo-Response-Size`.
pub const MAX_GENERATED_BODY: usize = 10 * 1024 * 1024;
