//! Configuration management infrastructure
//!
//! Layered configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Required-field and filesystem validation

/// File loading, validation and defaults
pub mod loader;

pub use loader::{ConfigError, ConfigErrorKind, ConfigLoader, ENV_PREFIX};
