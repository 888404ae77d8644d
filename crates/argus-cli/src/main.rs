//! Argus command-line entry point.

mod cli;
mod output;
mod progress;
mod scan;

use anyhow::Result;
use argus_core::{AppConfig, DataFiles};
use clap::Parser;
use cli::{Cli, Command};
use indicatif::MultiProgress;
use progress::LogWriter;
use std::process::ExitCode;
use tracing::debug;

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool, bars: MultiProgress) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "info,argus=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbose).with_writer(LogWriter::new(bars)))
        .with(filter)
        .init();
}

async fn run(cli: Cli, bars: MultiProgress) -> Result<()> {
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => AppConfig::config_dir()?,
    };
    let files = DataFiles::new(config_dir);
    debug!("Using data directory {}", files.dir().display());
    let config = AppConfig::load_with_env(&files.config())?;

    match cli.command {
        Command::Scan(args) => scan::run_scan(args, &config, &files, bars).await,
        Command::Config(args) => scan::run_config(args, config, &files),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let bars = MultiProgress::new();
    init_tracing(cli.verbose, bars.clone());

    match run(cli, bars).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
