//! LeadSink trait - durable lead storage interface

use crate::{ContractError, LeadDraft, LeadReceipt};

/// Lead storage trait
///
/// Appends are not idempotent: appending the same draft twice stores two leads.
#[trait_variant::make(LeadSink: Send)]
pub trait LocalLeadSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one lead
    ///
    /// # Errors
    /// `SinkConnection` when storage is unreachable, `SinkWrite` otherwise.
    async fn append(&mut self, lead: &LeadDraft) -> Result<LeadReceipt, ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
