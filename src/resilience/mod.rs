//! Resilience-simulation subsystem.
//!
//! # Data Flow
//! ```text
//! matched scenario
//!     → circuit_breaker::admit (open breaker short-circuits to 503)
//!     → response selection / injection
//!     → circuit_breaker::record (outcome updates the state machine)
//! ```
//!
//! # Design Decisions
//! - One breaker per scenario, guarded by that scenario's own lock, so
//!   contention stays proportional to each scenario's traffic
//! - Admission and outcome recording are separate critical sections; the
//!   scenario is the only writer for its own state

pub mod circuit_breaker;

pub use circuit_breaker::{BreakerPhase, BreakerState};
