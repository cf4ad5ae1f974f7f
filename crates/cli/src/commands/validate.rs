//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::{collect_warnings, ConfigLoader};
use contracts::{LeadsConfig, StorageBackend};
use serde::Serialize;
use tracing::info;

use super::env_vars;
use crate::cli::{Cli, ValidateArgs};
use crate::init_logging;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sheet_id: String,
    view_name: String,
    storage: String,
    channels: Vec<String>,
    interval_secs: u64,
    state_path: String,
}

/// Execute the `validate` command
pub fn run_validate(cli: &Cli, args: &ValidateArgs) -> Result<()> {
    let _log_guard = init_logging(cli, None, None)?;
    info!(config = ?cli.config, "Validating configuration");

    let result = validate_config(cli.config.as_deref(), env_vars());

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config<I>(path: Option<&Path>, vars: I) -> ValidationResult
where
    I: IntoIterator<Item = (String, String)>,
{
    let config_path = path.map(|p| p.display().to_string());

    match ConfigLoader::load(path, vars) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(config: &LeadsConfig) -> ConfigSummary {
    let notify = &config.notify;
    let mut channels = Vec::new();
    if notify.telegram_enabled().is_some() {
        channels.push("telegram".to_string());
    }
    if notify.email_enabled().is_some() {
        channels.push("email".to_string());
    }
    if notify.log {
        channels.push("log".to_string());
    }

    let storage = match config.storage.backend {
        StorageBackend::Postgres => format!(
            "postgres ({}:{}/{})",
            config.storage.postgres.host,
            config.storage.postgres.port,
            config.storage.postgres.database
        ),
        StorageBackend::Jsonl => match &config.storage.jsonl_path {
            Some(path) => format!("jsonl ({})", path.display()),
            None => "jsonl".to_string(),
        },
        StorageBackend::Disabled => "disabled".to_string(),
    };

    ConfigSummary {
        version: format!("{:?}", config.version),
        sheet_id: config.source.sheet_id.clone(),
        view_name: config.source.view_name.clone(),
        storage,
        channels,
        interval_secs: config.schedule.interval_secs,
        state_path: config.state.path.display().to_string(),
    }
}

fn print_validation_result(result: &ValidationResult) {
    let source = result.config_path.as_deref().unwrap_or("environment");

    if result.valid {
        println!("✓ Configuration is valid: {}", source);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sheet: {} / {}", summary.sheet_id, summary.view_name);
            println!("  Storage: {}", summary.storage);
            if summary.channels.is_empty() {
                println!("  Channels: none");
            } else {
                println!("  Channels: {}", summary.channels.join(", "));
            }
            println!("  Interval: {}s", summary.interval_secs);
            println!("  State file: {}", summary.state_path);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", source);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
