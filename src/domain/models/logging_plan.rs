//! Logging setup described as data
//!
//! A [`LoggingPlan`] is derived from a loaded configuration and applied once
//! at process start by the logging infrastructure.

use std::path::PathBuf;
use std::time::Duration;

use super::config::LogLevel;

/// File name of the bouncer log inside `log_dir`
pub const LOG_FILE_NAME: &str = "crowdsec-custom-bouncer.log";

/// Timestamp prefix of file log lines (`DD-MM-YYYY HH:MM:SS`)
pub const FILE_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// How the process-wide logger should be set up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingPlan {
    /// Minimum severity written
    pub level: LogLevel,
    /// Destination of log lines
    pub sink: LogSink,
}

/// Destination of log lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Standard output, default formatting
    Stdout,
    /// Rotating plain-text file
    File {
        /// Log file path
        path: PathBuf,
        /// When and how the file is rotated
        rotation: RotationPolicy,
    },
}

/// Size-based rotation with count and age retention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size in megabytes at which the file is rotated
    pub max_size_mb: u64,
    /// Rotated files kept, 0 keeps all
    pub max_backups: usize,
    /// Days a rotated file is kept, 0 keeps forever
    pub max_age_days: u64,
    /// Gzip rotated files
    pub compress: bool,
}

impl RotationPolicy {
    /// Rotation threshold in bytes
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }

    /// Retention window for rotated files
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days * 24 * 60 * 60)
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_mb: 500,
            max_backups: 3,
            max_age_days: 28,
            compress: true,
        }
    }
}
