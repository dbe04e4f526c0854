//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - stdout or rotating file output, chosen by a [`LoggingPlan`](crate::LoggingPlan)
//! - size-based log rotation with compressed backups
//! - `DD-MM-YYYY HH:MM:SS` timestamps in the log file

/// Global subscriber installation
pub mod logger;
/// Rotating log file sink
pub mod rotation;

pub use logger::{debug, error, info, instrument, trace, warn};
pub use logger::{FileTimestamp, LoggerImpl, LoggingError};
pub use rotation::RotatingFileWriter;
