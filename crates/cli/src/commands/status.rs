//! `status` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::LeadsConfig;
use serde::Serialize;
use watermark::{FileWatermarkStore, WatermarkStore};

use super::env_vars;
use crate::cli::{Cli, StatusArgs};
use crate::error::CliError;
use crate::init_logging;

#[derive(Debug, Serialize)]
struct StatusReport {
    state_file: String,
    configured_key: String,
    watermarks: Vec<WatermarkEntry>,
}

#[derive(Debug, Serialize)]
struct WatermarkEntry {
    key: String,
    last_row: usize,
    /// Data rows consumed (header excluded)
    processed_rows: usize,
    configured: bool,
}

/// Execute the `status` command
///
/// Reads the state file only; the sheet credentials are not required.
pub fn run_status(cli: &Cli, args: &StatusArgs) -> Result<()> {
    let _log_guard = init_logging(cli, None, None)?;

    let config = ConfigLoader::load_unvalidated(cli.config.as_deref(), env_vars())
        .map_err(CliError::Config)?;
    let store = FileWatermarkStore::open(&config.state.path);
    let report = status_report(&config, &store);

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
        println!("{}", json);
    } else {
        print_status(&report);
    }
    Ok(())
}

fn status_report(config: &LeadsConfig, store: &impl WatermarkStore) -> StatusReport {
    let configured_key = config.watermark_key().storage_key();

    let watermarks = store
        .entries()
        .into_iter()
        .map(|(key, last_row)| WatermarkEntry {
            configured: key == configured_key,
            processed_rows: last_row.saturating_sub(1),
            key,
            last_row,
        })
        .collect();

    StatusReport {
        state_file: config.state.path.display().to_string(),
        configured_key,
        watermarks,
    }
}

fn print_status(report: &StatusReport) {
    println!("State file: {}", report.state_file);

    if report.watermarks.is_empty() {
        println!("\n  No watermarks stored yet");
        return;
    }

    println!();
    for entry in &report.watermarks {
        let marker = if entry.configured { "*" } else { " " };
        println!(
            "{} {}  last_row={} ({} rows processed)",
            marker, entry.key, entry.last_row, entry.processed_rows
        );
    }

    if !report.watermarks.iter().any(|e| e.configured) {
        println!("\n  {} has not been polled yet", report.configured_key);
    }
}
