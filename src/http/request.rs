//! Request capture and transformation.
//!
//! # Responsibilities
//! - Carry the request ID assigned by the outermost middleware
//! - Flatten the request into a [`RequestContext`]: the single read-model
//!   consumed by scenario matching, the template engine, and the echo dump
//! - Canonicalize header names the way HTTP/1 spells them (`User-Agent`)
//!   so matching and templates are case-stable

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::Request;
use axum::http::HeaderMap;

/// Response/request header used for request correlation.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID attached to request extensions by the ID middleware.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Flattened view of a request, captured once per dispatch.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: String,
    pub method: String,
    pub path: String,
    pub raw_query: String,
    /// First value per query parameter, percent-decoded.
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub remote_addr: String,
    pub body: Bytes,
    /// `{var}` values extracted by the path matcher.
    pub path_vars: HashMap<String, String>,
}

impl RequestContext {
    /// Consume a buffered request into a context. The body has already been
    /// bounded by the history middleware, so the in-memory read here cannot
    /// exceed `max_body_size`.
    pub async fn capture(req: Request, remote: Option<SocketAddr>, max_body_size: usize) -> Self {
        let id = req
            .extensions()
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_default();
        let (parts, body) = req.into_parts();
        let raw_query = parts.uri.query().unwrap_or_default().to_string();
        let body = axum::body::to_bytes(body, max_body_size)
            .await
            .unwrap_or_default();

        Self {
            id,
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parse_query(&raw_query),
            raw_query,
            headers: parts.headers,
            remote_addr: remote.map(|a| a.to_string()).unwrap_or_default(),
            body,
            path_vars: HashMap::new(),
        }
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Headers flattened to one value per canonical name.
    pub fn headers_flat(&self) -> HashMap<String, String> {
        flatten_headers(&self.headers)
    }

    /// Headers as a multi-valued map with canonical names, for history
    /// records and the echo dump.
    pub fn headers_multi(&self) -> HashMap<String, Vec<String>> {
        multi_headers(&self.headers)
    }

    /// Query values grouped per key, mirroring the raw query string.
    pub fn query_multi(&self) -> HashMap<String, Vec<String>> {
        let mut multi: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(self.raw_query.as_bytes()) {
            multi.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        multi
    }

    /// Body bytes as UTF-8, lossily.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Headers flattened to one value per canonical name.
pub fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    for (name, value) in headers {
        if let Ok(v) = value.to_str() {
            flat.entry(canonical_header_name(name.as_str()))
                .or_insert_with(|| v.to_string());
        }
    }
    flat
}

/// Headers as a multi-valued map with canonical names.
pub fn multi_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut multi: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        if let Ok(v) = value.to_str() {
            multi
                .entry(canonical_header_name(name.as_str()))
                .or_default()
                .push(v.to_string());
        }
    }
    multi
}

/// Parse a raw query string into first-value-per-key form.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
        flat.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    flat
}

/// Canonicalize a header name: `user-agent` → `User-Agent`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
