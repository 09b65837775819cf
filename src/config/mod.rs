//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! scenarios.yaml (optional)
//!     → loader.rs (parse & deserialize; missing file is a warning)
//!     → validation.rs (semantic checks per scenario)
//!     → ScenarioRegistry (published for the dispatcher)
//!
//! environment variables
//!     → loader.rs (override ServerConfig defaults)
//!     → ServerConfig (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; scenarios are the only runtime-mutable
//!   state and they are append-only
//! - All fields have defaults so the server runs with no config at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ServerConfig;
