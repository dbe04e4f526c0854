use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::models::config::{
    BouncerConfig, LogMode, DEFAULT_CACHE_RETENTION, DEFAULT_LOG_DIR,
};

/// Prefix of environment variables overriding configuration keys,
/// e.g. `CROWDSEC_BOUNCER_LOG_LEVEL=debug`
pub const ENV_PREFIX: &str = "CROWDSEC_BOUNCER_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The document is malformed or a field has the wrong type
    #[error("failed to unmarshal {}: {source}", .path.display())]
    Parse {
        /// File that was being parsed
        path: PathBuf,
        /// Decoding failure
        #[source]
        source: Box<figment::Error>,
    },

    /// `bin_path` is absent or empty
    #[error("bin_path is not set")]
    BinPathNotSet,

    /// `log_mode` is absent or empty
    #[error("log_mode is not set")]
    LogModeNotSet,

    /// Carries the configuration as parsed so far
    #[error("binary '{}' doesn't exist", .path.display())]
    BinaryNotFound {
        /// The missing `bin_path`
        path: PathBuf,
        /// Configuration before defaults were applied
        config: Box<BouncerConfig>,
    },

    /// `log_mode` is neither `file` nor `stdout`
    #[error("log mode '{0}' unknown, expecting 'file' or 'stdout'")]
    UnknownLogMode(String),
}

/// Broad category of a [`ConfigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The file could not be opened or read
    Read,
    /// The document is not valid YAML or has mistyped fields
    Parse,
    /// A field failed a semantic check
    Validation,
}

impl ConfigError {
    /// Category of this error
    pub const fn kind(&self) -> ConfigErrorKind {
        match self {
            Self::Read { .. } => ConfigErrorKind::Read,
            Self::Parse { .. } => ConfigErrorKind::Parse,
            Self::BinPathNotSet
            | Self::LogModeNotSet
            | Self::BinaryNotFound { .. }
            | Self::UnknownLogMode(_) => ConfigErrorKind::Validation,
        }
    }

    /// Configuration parsed before the error, only set for a missing binary
    pub fn partial_config(&self) -> Option<&BouncerConfig> {
        match self {
            Self::BinaryNotFound { config, .. } => Some(config),
            _ => None,
        }
    }
}

/// Loads and validates the bouncer configuration file
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a specific file
    ///
    /// Steps, stopping at the first failure:
    /// 1. read the file
    /// 2. parse it, with `CROWDSEC_BOUNCER_*` environment overrides on top
    /// 3. require `bin_path` and `log_mode`
    /// 4. require `bin_path` to exist
    /// 5. check `log_mode` and default `log_dir` in file mode
    /// 6. default `cache_retention_duration`
    ///
    /// No global logging state is touched; use
    /// [`BouncerConfig::logging_plan`] on the result to set up logging.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<BouncerConfig, ConfigError> {
        let path = path.as_ref();

        let bytes = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // the file was read; undecodable content is a malformed document
        let contents = String::from_utf8(bytes).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(figment::Error::from(format!(
                "configuration is not valid UTF-8: {err}"
            ))),
        })?;

        let mut config = Self::parse(path, &contents)?;
        debug!(path = %path.display(), "parsed bouncer configuration");

        Self::validate(&config)?;

        if matches!(fs::metadata(&config.bin_path), Err(ref err) if err.kind() == io::ErrorKind::NotFound)
        {
            return Err(ConfigError::BinaryNotFound {
                path: config.bin_path.clone(),
                config: Box::new(config),
            });
        }

        match &config.log_mode {
            LogMode::File => {
                if config.log_dir().is_none() {
                    config.log_dir = Some(PathBuf::from(DEFAULT_LOG_DIR));
                }
            }
            // Unset was already rejected by validate
            LogMode::Stdout | LogMode::Unset => {}
            LogMode::Unknown(mode) => return Err(ConfigError::UnknownLogMode(mode.clone())),
        }

        if config.has_rotation_overrides() {
            warn!(
                log_max_size = ?config.log_max_size,
                log_max_files = ?config.log_max_files,
                log_max_age = ?config.log_max_age,
                compress_logs = ?config.compress_logs,
                "log rotation settings are ignored, the bouncer log file uses a fixed rotation policy"
            );
        }

        if config.cache_retention_duration.is_zero() {
            info!("cache_retention_duration defaults to 10 seconds");
            config.cache_retention_duration = DEFAULT_CACHE_RETENTION;
        }

        Ok(config)
    }

    /// Alias of [`ConfigLoader::load_from_file`]
    pub fn load(path: impl AsRef<Path>) -> Result<BouncerConfig, ConfigError> {
        Self::load_from_file(path)
    }

    /// Required-field checks that do not touch the filesystem
    pub fn validate(config: &BouncerConfig) -> Result<(), ConfigError> {
        if config.bin_path.as_os_str().is_empty() {
            return Err(ConfigError::BinPathNotSet);
        }

        if config.log_mode == LogMode::Unset {
            return Err(ConfigError::LogModeNotSet);
        }

        Ok(())
    }

    fn parse(path: &Path, contents: &str) -> Result<BouncerConfig, ConfigError> {
        let mut figment = Figment::new();

        // an empty document is an empty mapping
        if !contents.trim().is_empty() {
            figment = figment.merge(Yaml::string(contents));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source: Box::new(source),
            })
    }
}
