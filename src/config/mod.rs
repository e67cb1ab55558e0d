//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → settings file (TOML, optional)
//!     → environment overlay (deployment contract keys)
//!     → validation.rs (per-host semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to every stage and registry
//! ```
//!
//! # Design Decisions
//! - The snapshot is resolved once at startup and never mutated; no stage
//!   reads the environment at request time
//! - Absent keys resolve to documented defaults; malformed or missing
//!   required keys abort startup
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, Environment, HostKind};
pub use validation::validate_config;
