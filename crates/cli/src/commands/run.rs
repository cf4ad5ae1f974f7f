//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{error, info};

use super::load_config;
use crate::cli::{Cli, RunArgs};
use crate::init_logging;
use crate::pipeline::build_poller;

/// Execute the `run` command
pub async fn run_poller(cli: &Cli, args: &RunArgs) -> Result<()> {
    let mut config = load_config(cli)?;

    // Apply CLI overrides
    if let Some(interval) = args.interval {
        anyhow::ensure!(interval > 0, "--interval must be > 0");
        config.schedule.interval_secs = interval;
    }
    let metrics_port = args
        .metrics_port
        .or(config.metrics.port)
        .filter(|port| *port != 0);

    let _log_guard = init_logging(cli, config.logging.file.clone(), metrics_port)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Lead Poller starting"
    );
    info!(
        sheet_id = %config.source.sheet_id,
        view = %config.source.view_name,
        storage = ?config.storage.backend,
        interval_secs = config.schedule.interval_secs,
        state = %config.state.path.display(),
        "Configuration loaded"
    );

    let poller = build_poller(&config, false)?;

    let stats = poller
        .run_until(shutdown_signal())
        .await
        .context("Poller execution failed")?;

    stats.print_summary();

    info!("Lead Poller finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
