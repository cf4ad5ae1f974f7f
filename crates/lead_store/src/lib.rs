//! # Lead Store
//!
//! Durable storage of leads.
//!
//! - [`PostgresLeadSink`]: the `leads` table, connection managed lazily
//! - [`JsonlLeadSink`]: append-only JSON lines file
//! - [`LeadStore`]: backend picked from configuration at runtime

mod jsonl;
mod postgres;

pub use jsonl::JsonlLeadSink;
pub use postgres::PostgresLeadSink;

use contracts::{
    ContractError, LeadDraft, LeadReceipt, LeadSink, StorageBackend, StorageConfig,
};
use tracing::info;

/// Configured lead storage backend
pub enum LeadStore {
    Postgres(PostgresLeadSink),
    Jsonl(JsonlLeadSink),
}

impl LeadStore {
    /// Build the configured backend
    ///
    /// Returns `Ok(None)` when storage is disabled.
    ///
    /// # Errors
    /// `ConfigValidation` when the jsonl backend has no path,
    /// `SinkConnection` when the jsonl file cannot be opened.
    pub fn from_config(config: &StorageConfig) -> Result<Option<Self>, ContractError> {
        let store = match config.backend {
            StorageBackend::Disabled => {
                info!("Lead storage disabled");
                return Ok(None);
            }
            StorageBackend::Postgres => Self::Postgres(PostgresLeadSink::new(config.postgres.clone())),
            StorageBackend::Jsonl => {
                let path = config.jsonl_path.as_ref().ok_or_else(|| {
                    ContractError::config_validation(
                        "storage.jsonl_path",
                        "jsonl backend requires an output path",
                    )
                })?;
                Self::Jsonl(JsonlLeadSink::open(path)?)
            }
        };

        info!(backend = store.name(), "Lead storage ready");
        Ok(Some(store))
    }
}

impl LeadSink for LeadStore {
    fn name(&self) -> &str {
        match self {
            Self::Postgres(sink) => sink.name(),
            Self::Jsonl(sink) => sink.name(),
        }
    }

    async fn append(&mut self, lead: &LeadDraft) -> Result<LeadReceipt, ContractError> {
        match self {
            Self::Postgres(sink) => sink.append(lead).await,
            Self::Jsonl(sink) => sink.append(lead).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Postgres(sink) => sink.close().await,
            Self::Jsonl(sink) => sink.close().await,
        }
    }
}
