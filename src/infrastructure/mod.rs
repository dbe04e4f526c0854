//! Infrastructure layer module
//!
//! - Configuration loading (figment, YAML + environment)
//! - Logging setup (tracing subscriber, rotating log file)

pub mod config;
pub mod logging;
