//! `once` command implementation.

use anyhow::{Context, Result};
use contracts::CycleReport;
use tracing::info;

use super::load_config;
use crate::cli::{Cli, OnceArgs};
use crate::init_logging;
use crate::pipeline::build_poller;

/// Execute the `once` command
pub async fn run_once(cli: &Cli, args: &OnceArgs) -> Result<()> {
    let config = load_config(cli)?;
    let _log_guard = init_logging(cli, config.logging.file.clone(), None)?;

    info!(
        sheet_id = %config.source.sheet_id,
        view = %config.source.view_name,
        dry_run = args.dry_run,
        "Running a single poll cycle"
    );

    let report = build_poller(&config, args.dry_run)?
        .run_once()
        .await
        .context("Poll cycle failed")?;

    println!("{}", render_report(&report));
    Ok(())
}

fn render_report(report: &CycleReport) -> String {
    let mut lines = vec![
        format!("Outcome: {}", report.outcome),
        format!("Rows fetched: {}", report.rows_fetched),
        format!(
            "Watermark: {} -> {}",
            report.previous_watermark, report.watermark
        ),
    ];

    if report.new_rows > 0 {
        lines.push(format!("New rows: {}", report.new_rows));
        lines.push(format!(
            "Leads stored: {} (failed: {})",
            report.leads_persisted, report.leads_failed
        ));
        lines.push(format!(
            "Notifications sent: {} (failed: {})",
            report.notifications_sent, report.notifications_failed
        ));
    }
    if !report.watermark_persisted {
        lines.push("Watermark could not be saved".to_string());
    }
    if let Some(ref error) = report.error {
        lines.push(format!("Error: {error}"));
    }

    lines.join("\n")
}
