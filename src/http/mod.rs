//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum router, fixed endpoints, catch-all)
//!     → middleware.rs (request ID, history/metrics, CORS, rate limit)
//!     → request.rs (flatten into RequestContext)
//!     → scenario dispatch / echo / control API / streaming
//! ```

pub mod control;
pub mod middleware;
pub mod request;
pub mod server;
pub mod streaming;

pub use request::{RequestContext, RequestId, X_REQUEST_ID};
pub use server::{AppState, MockServer};
