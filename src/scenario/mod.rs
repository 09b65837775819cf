//! Scenario engine: the table of programmed behaviors and the logic that
//! resolves an incoming request to one of them.
//!
//! # Data Flow
//! ```text
//! request path + method
//!     → path.rs (exact key fast path, {var} template slow path)
//!     → registry.rs (snapshot of the scenario list for that key)
//!     → matching.rs (header/query/body predicates, insertion order)
//!     → faults::inject (response selection and sculpting)
//! ```
//!
//! # Design Decisions
//! - Registry values are published copy-on-write: readers hold a snapshot
//!   for the whole request, writers replace the list wholesale
//! - Scenario lists are append-only; insertion order is match precedence
//! - The exact-key lookup keeps the common case O(1); template matching
//!   only walks the table when a request misses the fast path

pub mod matching;
pub mod path;
pub mod registry;
pub mod spec;

pub use registry::ScenarioRegistry;
pub use spec::{BreakerConfig, JsonBody, MatchConfig, ResponseSpec, Scenario};
