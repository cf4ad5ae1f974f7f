//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lead Poller - turns new spreadsheet form rows into stored, announced leads
#[derive(Parser, Debug)]
#[command(
    name = "lead-poller",
    author,
    version,
    about = "Spreadsheet form lead poller",
    long_about = "Polls a Google Sheets view fed by a form for new rows.\n\n\
                  Every new row is stored as a lead (PostgreSQL or JSON lines) \n\
                  and announced on the configured channels (Telegram, email)."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LEAD_POLLER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "LEAD_POLLER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Optional configuration file (TOML or JSON); environment variables override it
    #[arg(short, long, global = true, env = "LEAD_POLLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment file loaded before reading variables
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level implied by `-v` / `-q`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the sheet until interrupted
    Run(RunArgs),

    /// Run a single poll cycle and exit
    Once(OnceArgs),

    /// Validate configuration without polling
    Validate(ValidateArgs),

    /// Show stored watermarks
    Status(StatusArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Override the poll interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Override the Prometheus metrics port (0 = disabled)
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `once` command
#[derive(Parser, Debug, Clone)]
pub struct OnceArgs {
    /// Keep the watermark in memory, skip storage and log notifications only
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `status` command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
