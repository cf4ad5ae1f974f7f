//! # Lead Poller CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Poll loop orchestration and lifecycle management
//! - Graceful shutdown handling

mod cli;
mod commands;
mod error;
mod pipeline;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use observability::{LogGuard, ObservabilityConfig};

use cli::{Cli, Commands};
use commands::{run_once, run_poller, run_status, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    load_env_file(cli.env_file.as_deref())?;

    // Execute command
    let result = match &cli.command {
        Commands::Run(args) => run_poller(&cli, args).await,
        Commands::Once(args) => run_once(&cli, args).await,
        Commands::Validate(args) => run_validate(&cli, args),
        Commands::Status(args) => run_status(&cli, args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
    }

    result
}

/// Load an explicit `--env-file`; variables already set are kept
fn load_env_file(path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
    }
    Ok(())
}

/// Initialize logging based on CLI options
///
/// `log_file` receives a plain copy of everything written to stdout. Keep the
/// returned guard until the command returns.
pub(crate) fn init_logging(
    cli: &Cli,
    log_file: Option<PathBuf>,
    metrics_port: Option<u16>,
) -> Result<LogGuard> {
    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        default_log_level: cli.log_level().to_string(),
        log_file,
    })
}
