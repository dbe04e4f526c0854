use chrono::Local;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use super::rotation::RotatingFileWriter;
use crate::domain::models::config::LogLevel;
use crate::domain::models::logging_plan::{LogSink, LoggingPlan, FILE_TIMESTAMP_FORMAT};

/// Errors raised while installing the process-wide logger
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The log file or its directory could not be created
    #[error("failed to open log file {}: {source}", .path.display())]
    OpenLogFile {
        /// Log file path from the plan
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Another subscriber was installed first
    #[error("a global logger is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Logger implementation using tracing
pub struct LoggerImpl {
    guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber described by `plan`
    ///
    /// Call once, at process start. `RUST_LOG` overrides the plan's level.
    /// Keep the returned value alive for as long as the process logs: for
    /// file sinks, dropping it flushes and stops the background writer.
    pub fn init(plan: &LoggingPlan) -> Result<Self, LoggingError> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(Level::from(plan.level).into())
            .from_env_lossy();

        let guard = match &plan.sink {
            LogSink::Stdout => {
                let stdout_layer = tracing_subscriber::fmt::layer()
                    .with_writer(io::stdout)
                    .with_target(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .try_init()?;

                None
            }
            LogSink::File { path, rotation } => {
                let file_appender = RotatingFileWriter::open(path, rotation).map_err(|source| {
                    LoggingError::OpenLogFile {
                        path: path.clone(),
                        source,
                    }
                })?;

                let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking_file)
                    .with_ansi(false)
                    .with_timer(FileTimestamp)
                    .with_target(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(file_layer)
                    .try_init()?;

                Some(guard)
            }
        };

        tracing::debug!(
            level = %plan.level,
            sink = ?plan.sink,
            "logger initialized"
        );

        Ok(Self { guard })
    }

    /// Whether lines are written by a background worker
    pub const fn is_buffered(&self) -> bool {
        self.guard.is_some()
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => Self::ERROR,
        }
    }
}

/// Local time as `DD-MM-YYYY HH:MM:SS`, used for file log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTimestamp;

impl FormatTime for FileTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format(FILE_TIMESTAMP_FORMAT))
    }
}

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, trace, warn};
