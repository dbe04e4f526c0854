//! CrowdSec custom bouncer entry point.

use clap::Parser;

use custom_bouncer::cli::{handle_error, run, Cli};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        handle_error(&err);
    }
}
