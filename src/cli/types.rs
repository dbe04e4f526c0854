//! CLI type definitions
//!
//! This module contains the clap structure that defines the command line.

use clap::Parser;
use std::path::PathBuf;

/// Where packaged installs put the bouncer configuration
pub const DEFAULT_CONFIG_PATH: &str = "/etc/crowdsec/bouncers/crowdsec-custom-bouncer.yaml";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "crowdsec-custom-bouncer")]
#[command(about = "CrowdSec custom bouncer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the bouncer configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Check the configuration file and exit
    #[arg(short, long)]
    pub test_config: bool,
}
