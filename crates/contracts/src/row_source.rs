//! RowSource trait - Ingestion output interface
//!
//! Abstracts where sheet rows come from, so the poll cycle can run against
//! the Google Sheets API or an in-memory script alike.

use crate::{ContractError, RowSet, WatermarkKey};

/// Tabular row source
///
/// Every fetch returns the *whole* current view; diffing is the caller's job.
#[trait_variant::make(RowSource: Send)]
pub trait LocalRowSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Fetch all rows of one view, header first
    ///
    /// # Errors
    /// `AccessDenied`, `SourceNotFound`, `SourceAuth`, `SourceTransport` or
    /// `SourceApi`. All of them are terminal for the current cycle only.
    async fn fetch(&mut self, key: &WatermarkKey) -> Result<RowSet, ContractError>;
}
