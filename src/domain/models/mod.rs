//! Domain models for the bouncer configuration

/// The bouncer configuration document
pub mod config;
/// How and where the bouncer logs
pub mod logging_plan;

pub use config::{
    parse_duration, BouncerConfig, LogLevel, LogMode, DEFAULT_CACHE_RETENTION, DEFAULT_LOG_DIR,
};
pub use logging_plan::{
    LogSink, LoggingPlan, RotationPolicy, FILE_TIMESTAMP_FORMAT, LOG_FILE_NAME,
};
