//! Per-scenario circuit breaker.
//!
//! # States
//! - Closed: responses are served normally
//! - Open: requests are refused with 503 until the timeout elapses
//! - Half-Open: requests pass through while the scenario proves itself
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_threshold consecutive 5xx responses
//! Open → Half-Open: first request after the open timeout
//! Half-Open → Closed: success_threshold consecutive non-5xx responses
//! Half-Open → Open: any 5xx response
//! ```

use std::time::Instant;

use crate::scenario::spec::Scenario;

/// Phase of the breaker state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BreakerPhase {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Runtime state, reachable only through the owning scenario's lock.
#[derive(Debug, Default)]
pub struct BreakerState {
    pub phase: BreakerPhase,
    /// Consecutive failures while closed.
    pub failures: u32,
    /// Consecutive successes while half-open.
    pub successes: u32,
    pub last_failure: Option<Instant>,
    pub last_transition: Option<Instant>,
}

/// Decide whether a request may proceed. An open breaker whose timeout has
/// elapsed moves to half-open and admits the request as a probe.
///
/// This is a single critical section; the post-response update happens in
/// [`record`].
pub fn admit(scenario: &Scenario) -> bool {
    let mut state = scenario
        .breaker
        .lock()
        .expect("breaker mutex poisoned");

    if state.phase != BreakerPhase::Open {
        return true;
    }

    let since = state
        .last_transition
        .map(|t| t.elapsed())
        .unwrap_or_default();
    if since > scenario.circuit_breaker.timeout {
        state.phase = BreakerPhase::HalfOpen;
        state.last_transition = Some(Instant::now());
        tracing::info!(
            path = %scenario.path,
            method = %scenario.method,
            "circuit breaker half-open, admitting probe request"
        );
        return true;
    }
    false
}

/// Record the outcome of a served request. Success means the final status
/// was below 500 (or the probability gate fell through to echo).
pub fn record(scenario: &Scenario, success: bool) {
    let mut state = scenario
        .breaker
        .lock()
        .expect("breaker mutex poisoned");

    match state.phase {
        BreakerPhase::Open => {}
        BreakerPhase::HalfOpen => {
            if success {
                state.successes += 1;
                if state.successes >= scenario.circuit_breaker.success_threshold {
                    state.phase = BreakerPhase::Closed;
                    state.failures = 0;
                    state.successes = 0;
                    state.last_transition = Some(Instant::now());
                    tracing::info!(
                        path = %scenario.path,
                        method = %scenario.method,
                        "circuit breaker closed, scenario recovered"
                    );
                }
            } else {
                state.phase = BreakerPhase::Open;
                state.last_transition = Some(Instant::now());
                tracing::warn!(
                    path = %scenario.path,
                    method = %scenario.method,
                    "probe failed, circuit breaker re-opened"
                );
            }
        }
        BreakerPhase::Closed => {
            if success {
                state.failures = 0;
            } else {
                state.failures += 1;
                state.last_failure = Some(Instant::now());
                if state.failures >= scenario.circuit_breaker.failure_threshold {
                    state.phase = BreakerPhase::Open;
                    state.last_transition = Some(Instant::now());
                    tracing::warn!(
                        path = %scenario.path,
                        method = %scenario.method,
                        failures = state.failures,
                        "failure threshold reached, circuit breaker opened"
                    );
                }
            }
        }
    }
}

/// Snapshot the current phase, for tests and introspection.
pub fn phase(scenario: &Scenario) -> BreakerPhase {
    scenario
        .breaker
        .lock()
        .expect("breaker mutex poisoned")
        .phase
}
