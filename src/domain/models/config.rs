use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::logging_plan::{LogSink, LoggingPlan, RotationPolicy, LOG_FILE_NAME};

/// Directory used for the log file when `log_mode: file` leaves `log_dir` empty
pub const DEFAULT_LOG_DIR: &str = "/var/log/";

/// Retention applied when `cache_retention_duration` is absent or zero
pub const DEFAULT_CACHE_RETENTION: Duration = Duration::from_secs(10);

/// Bouncer configuration, as read from the YAML document
///
/// After a successful [`ConfigLoader::load`](crate::ConfigLoader::load):
/// - `bin_path` is non-empty and existed at load time
/// - `log_mode` is [`LogMode::File`] or [`LogMode::Stdout`]
/// - `log_dir` is set whenever `log_mode` is [`LogMode::File`]
/// - `cache_retention_duration` is non-zero
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BouncerConfig {
    /// Path to the enforcement binary invoked for each decision
    #[serde(default, deserialize_with = "null_as_default")]
    pub bin_path: PathBuf,

    /// Directory for the pid file
    #[serde(default, rename = "piddir")]
    pub pid_dir: Option<PathBuf>,

    /// Decision polling interval, kept as written
    #[serde(default, deserialize_with = "deserialize_scalar_string")]
    pub update_frequency: Option<String>,

    /// Whether the bouncer should detach from the terminal
    #[serde(default, rename = "daemonize", deserialize_with = "deserialize_bool")]
    pub daemon: bool,

    /// Log destination
    #[serde(default, deserialize_with = "null_as_default")]
    pub log_mode: LogMode,

    /// Directory holding the log file in file mode
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Minimum severity written to the log
    #[serde(default, deserialize_with = "null_as_default")]
    pub log_level: LogLevel,

    /// Whether rotated log files are compressed
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub compress_logs: Option<bool>,

    /// Log file size in megabytes before rotation
    #[serde(default)]
    pub log_max_size: Option<u64>,

    /// Number of rotated log files to keep
    #[serde(default)]
    pub log_max_files: Option<u64>,

    /// Age in days after which rotated log files are removed
    #[serde(default)]
    pub log_max_age: Option<u64>,

    /// How long applied decisions stay cached
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub cache_retention_duration: Duration,
}

impl BouncerConfig {
    /// Directory the log file is written to, if one is configured
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Whether any of the log rotation tunables were set in the document
    pub fn has_rotation_overrides(&self) -> bool {
        self.compress_logs.is_some()
            || self.log_max_size.is_some()
            || self.log_max_files.is_some()
            || self.log_max_age.is_some()
    }

    /// Describe how logging should be set up for this configuration
    ///
    /// The plan is data only; nothing is installed until
    /// [`LoggerImpl::init`](crate::LoggerImpl::init) is called with it.
    pub fn logging_plan(&self) -> LoggingPlan {
        let sink = match self.log_mode {
            LogMode::File => {
                let dir = self.log_dir().unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR));
                LogSink::File {
                    path: dir.join(LOG_FILE_NAME),
                    rotation: RotationPolicy::default(),
                }
            }
            _ => LogSink::Stdout,
        };

        LoggingPlan {
            level: self.log_level,
            sink,
        }
    }
}

/// Where log output goes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LogMode {
    /// `log_mode` absent or empty
    #[default]
    Unset,
    /// Rotating log file under `log_dir`
    File,
    /// Standard output
    Stdout,
    /// Any other value; rejected by the loader
    Unknown(String),
}

impl LogMode {
    /// The value as it appears in the configuration file
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unset => "",
            Self::File => "file",
            Self::Stdout => "stdout",
            Self::Unknown(mode) => mode,
        }
    }
}

impl From<String> for LogMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Self::Unset,
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Unknown(value),
        }
    }
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log severity accepted in `log_level`
///
/// `fatal` and `panic` are accepted for compatibility with existing bouncer
/// configurations and behave like `error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Debugging detail
    Debug,
    /// Normal operation
    #[default]
    Info,
    /// Something looks wrong
    Warn,
    /// Failures
    Error,
    /// Failures that stop the bouncer
    Fatal,
    /// Failures that abort the bouncer
    Panic,
}

impl LogLevel {
    /// Lowercase name of the level
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Panic => "panic",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "" | "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            "panic" => Ok(Self::Panic),
            other => Err(format!(
                "not a valid log level: {other:?}, expected one of trace, debug, info, warn, error, fatal, panic"
            )),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a duration written with units (`10s`, `2m`, `1h 30m`, `250ms`)
///
/// A bare `0` is accepted as the zero duration.
pub fn parse_duration(value: &str) -> Result<Duration, humantime::DurationError> {
    let trimmed = value.trim();
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(trimmed)
}

/// Treat an explicit YAML `null` like an absent key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Durations are either strings with units or integer nanoseconds
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration such as \"10s\" or an integer number of nanoseconds")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_nanos(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_nanos)
                .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse_duration(v).map_err(|err| E::custom(format!("invalid duration {v:?}: {err}")))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Duration, E> {
            Ok(Duration::ZERO)
        }

        fn visit_none<E: de::Error>(self) -> Result<Duration, E> {
            Ok(Duration::ZERO)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<Duration, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// Any scalar is accepted as text, so `update_frequency: 10` reads as `"10"`
fn deserialize_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarStringVisitor;

    impl<'de> Visitor<'de> for ScalarStringVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or scalar value")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(ScalarStringVisitor)
}

/// Booleans also accept the YAML 1.1 words `yes`/`no`, `on`/`off` and `y`/`n`
fn deserialize_optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolVisitor;

    impl<'de> Visitor<'de> for BoolVisitor {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean such as true, false, yes or no")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            match v.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "on" => Ok(Some(true)),
                "false" | "no" | "n" | "off" => Ok(Some(false)),
                _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}

fn deserialize_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_bool(deserializer).map(Option::unwrap_or_default)
}
