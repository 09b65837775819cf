//! Fault injection: everything that shapes a response.
//!
//! # Data Flow
//! ```text
//! dispatcher (catch-all)
//!     → inject.rs (scenario selection, breaker gate, cursor, probability)
//!     → template.rs (body rendering against the request context)
//!     → delay / gzip / headers applied, response written
//!
//! no scenario matched → echo.rs (request mirror + X-Echo-* faults)
//! /api/stress/*       → stress.rs (CPU burn, memory allocation)
//! ```
//!
//! # Design Decisions
//! - The response cursor is an advisory atomic: racing requests may pick
//!   the same response, which is acceptable for a fault server
//! - A probability-gate miss falls through to echo and counts as a
//!   breaker success
//! - Template parse or render failures surface as 500, never as a panic

pub mod echo;
pub mod inject;
pub mod stress;
pub mod template;
