//! Command-line entry point
//!
//! Loads the configuration, then installs logging from the configuration's
//! [`LoggingPlan`](crate::LoggingPlan). Errors are returned to `main`, which
//! is the only place the process exits.

pub mod types;

pub use types::{Cli, DEFAULT_CONFIG_PATH};

use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing::{info, Level};

use crate::domain::models::config::BouncerConfig;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;

/// Run the bouncer bootstrap for the parsed command line
pub fn run(cli: &Cli) -> Result<()> {
    let config = load_config(&cli.config)?;

    if cli.test_config {
        println!("configuration file {} is valid", cli.config.display());
        return Ok(());
    }

    let _logger = LoggerImpl::init(&config.logging_plan()).context("failed to set up logging")?;

    info!(
        config = %cli.config.display(),
        bin_path = %config.bin_path.display(),
        log_mode = %config.log_mode,
        log_level = %config.log_level,
        daemonize = config.daemon,
        update_frequency = config.update_frequency.as_deref().unwrap_or_default(),
        cache_retention = ?config.cache_retention_duration,
        "custom bouncer configured"
    );

    Ok(())
}

/// Load the configuration with load-time events going to stderr
///
/// The configured log sink does not exist yet at this point, so a subscriber
/// is scoped to the load instead of being installed globally.
pub fn load_config(path: &Path) -> Result<BouncerConfig> {
    let bootstrap = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();

    tracing::subscriber::with_default(bootstrap, || ConfigLoader::load(path))
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

/// Report a fatal error and exit
pub fn handle_error(err: &anyhow::Error) -> ! {
    eprintln!("Error: {err:#}");
    std::process::exit(1)
}
