//! Command implementations.

mod once;
mod run;
mod status;
mod validate;

pub use once::run_once;
pub use run::run_poller;
pub use status::run_status;
pub use validate::run_validate;

use config_loader::ConfigLoader;
use contracts::LeadsConfig;

use crate::cli::Cli;
use crate::error::CliError;

/// Process environment; variables that are not valid UTF-8 are skipped
fn env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Load and validate configuration: optional file, then the environment
fn load_config(cli: &Cli) -> Result<LeadsConfig, CliError> {
    ConfigLoader::load(cli.config.as_deref(), env_vars()).map_err(CliError::Config)
}
