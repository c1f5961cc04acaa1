//! Veil CLI - strip image metadata, seal images behind a group-membership
//! proof and publish them to IPFS.
//!
//! # Usage
//!
//! ```bash
//! # Process every image in a directory
//! veil ./listing-photos
//!
//! # With debug logging
//! DEBUG=1 veil ./listing-photos
//!
//! # With an explicit config file
//! veil --config ./veil.toml ./listing-photos
//! ```
//!
//! Exits 0 on success and 5 on any fatal error.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;
mod logging;

/// Veil - scrub, seal and publish image collections.
#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of images to process
    directory: PathBuf,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "VEIL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config problems are reported after init.
    let loaded = cli::load_config(cli.config.as_deref());
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => veil_core::Config::default(),
    };
    logging::init_from_config(
        &config,
        cli.verbose,
        cli.json_logs,
        veil_core::config::debug_level_from_env(),
    );

    tracing::debug!("Veil v{}", veil_core::VERSION);

    let result = match loaded {
        Ok(config) => cli::execute(config, &cli.directory).await,
        Err(e) => Err(e),
    };
    ExitCode::from(cli::exit_status(&result))
}
