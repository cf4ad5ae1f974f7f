//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Overlay environment variables (the `.env` deployment style)
//! - Validate configuration legality
//! - Produce one `LeadsConfig` value for the whole process
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//!
//! let config = ConfigLoader::load(None, std::env::vars()).unwrap();
//! println!("Sheet: {}", config.source.sheet_id);
//! ```

mod env;
mod parser;
mod validator;

pub use contracts::LeadsConfig;
pub use env::known_variables;
pub use parser::ConfigFormat;
pub use validator::collect_warnings;

use contracts::ContractError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files, strings and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration: defaults, then the optional file, then `vars`
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure (file or variable)
    /// - Validation failure
    pub fn load<I>(path: Option<&Path>, vars: I) -> Result<LeadsConfig, ContractError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = Self::load_unvalidated(path, vars)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Same layering as [`load`](Self::load) without validation
    ///
    /// Used by read-only commands that do not touch the sheet.
    pub fn load_unvalidated<I>(path: Option<&Path>, vars: I) -> Result<LeadsConfig, ContractError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = match path {
            Some(path) => {
                let format = Self::detect_format(path)?;
                let content = Self::read_file(path)?;
                parser::parse(&content, format)?
            }
            None => Value::Object(Default::default()),
        };

        let vars: HashMap<String, String> = vars.into_iter().collect();
        env::apply(&mut tree, &vars)?;

        parser::into_config(tree)
    }

    /// Load configuration from file path only
    ///
    /// Automatically detects format from file extension (.toml / .json).
    pub fn load_from_path(path: &Path) -> Result<LeadsConfig, ContractError> {
        Self::load(Some(path), std::iter::empty())
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<LeadsConfig, ContractError> {
        let config = parser::into_config(parser::parse(content, format)?)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already-built configuration
    pub fn validate(config: &LeadsConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize LeadsConfig to TOML string
    pub fn to_toml(config: &LeadsConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize LeadsConfig to JSON string
    pub fn to_json(config: &LeadsConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
