//! Error types for CLI operations.

use contracts::ContractError;
use poller::PollerError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error")]
    Config(#[source] ContractError),

    /// The row source could not be built
    #[error("Failed to set up the row source")]
    SourceSetup(#[source] ContractError),

    /// The lead sink could not be built
    #[error("Failed to set up lead storage")]
    StorageSetup(#[source] ContractError),

    /// A cycle hit an unexpected internal failure
    #[error("Poller stopped on an internal failure")]
    Fatal(#[from] PollerError),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
