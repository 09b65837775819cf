//! Observability subsystem.
//!
//! # Design Decisions
//! - One dedicated Prometheus registry per server instance so tests get
//!   isolated metrics and `/metrics` never leaks process-global state
//! - The fault counter is the only resettable metric; inflight gauge and
//!   latency histogram survive a metrics reset

pub mod metrics;

pub use metrics::{FaultType, MockMetrics};
