//! CrowdSec custom bouncer - configuration bootstrap
//!
//! Reads the bouncer's YAML configuration, validates it, and sets up log
//! output. Enforcement itself (polling decisions, invoking the binary) is not
//! part of this crate.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): the configuration model and the
//!   [`LoggingPlan`] derived from it
//! - **Infrastructure Layer** (`infrastructure`): configuration loading and
//!   the tracing subscriber / rotating log file
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use custom_bouncer::{ConfigLoader, LoggerImpl};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load("/etc/crowdsec/bouncers/crowdsec-custom-bouncer.yaml")?;
//!     let _logger = LoggerImpl::init(&config.logging_plan())?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::models::{
    BouncerConfig, LogLevel, LogMode, LogSink, LoggingPlan, RotationPolicy,
    DEFAULT_CACHE_RETENTION, DEFAULT_LOG_DIR, LOG_FILE_NAME,
};
pub use infrastructure::config::{ConfigError, ConfigErrorKind, ConfigLoader};
pub use infrastructure::logging::{LoggerImpl, LoggingError, RotatingFileWriter};
