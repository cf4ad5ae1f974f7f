//! Configuration parsing module
//!
//! Supports TOML (primary) and JSON. Files are parsed into a generic value
//! tree first so the environment layer can be merged before deserialization.

use contracts::{ContractError, LeadsConfig};
use serde_json::Value;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML content into a value tree
pub fn parse_toml(content: &str) -> Result<Value, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON content into a value tree
pub fn parse_json(content: &str) -> Result<Value, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse by format
pub fn parse(content: &str, format: ConfigFormat) -> Result<Value, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

/// Deserialize a merged value tree; absent sections take their defaults
pub fn into_config(tree: Value) -> Result<LeadsConfig, ContractError> {
    serde_json::from_value(tree).map_err(|e| ContractError::ConfigParse {
        message: format!("invalid configuration: {e}"),
        source: Some(Box::new(e)),
    })
}
