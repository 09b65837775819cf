//! Programmable HTTP fault-injection server.
//!
//! Clients point their HTTP traffic at this server and receive responses
//! sculpted by declarative scenarios: status codes, delays, templated
//! bodies, gzip, probability gating, rotating response sequences, and a
//! per-scenario circuit breaker. Built for exercising retry, timeout,
//! circuit-breaker, and backpressure behavior in HTTP clients.
//!
//! # Features
//!
//! - **Scenarios**: bind a (path template, method) pair to an ordered list
//!   of responses, with optional header/query/body match predicates
//! - **Dynamic paths**: `/api/users/{id}` style templates with variable
//!   capture exposed to the body renderer
//! - **Circuit breaker**: per-scenario closed/open/half-open machine that
//!   turns a run of 5xx responses into immediate 503s
//! - **Echo**: default handler mirroring the request as JSON, with
//!   `X-Echo-*` headers for ad-hoc fault injection
//! - **Stress**: CPU-burn and memory-allocation endpoints
//! - **Control API**: add scenarios, inspect/replay history, reset metrics

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod scenario;

// Fault machinery
pub mod faults;
pub mod resilience;

// Cross-cutting concerns
pub mod health;
pub mod history;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::server::MockServer;
pub use scenario::registry::ScenarioRegistry;
