//! NotifyChannel trait - Dispatcher output interface

use chrono::{DateTime, Local};

use crate::{ContractError, LeadDraft};

/// Placeholder printed when the form has no such column
pub const NOT_SPECIFIED: &str = "Не указано";

/// One alert about a newly observed lead
#[derive(Debug, Clone)]
pub struct Notification {
    /// The lead being announced
    pub lead: LeadDraft,

    /// When the poller processed the row
    pub processed_at: DateTime<Local>,
}

impl Notification {
    pub fn new(lead: LeadDraft, processed_at: DateTime<Local>) -> Self {
        Self { lead, processed_at }
    }

    /// Processing time as shown to humans (`dd.mm.YYYY HH:MM:SS`)
    pub fn processed_at_display(&self) -> String {
        self.processed_at.format("%d.%m.%Y %H:%M:%S").to_string()
    }

    pub fn captured_at_or_default(&self) -> &str {
        self.lead.captured_at.as_deref().unwrap_or(NOT_SPECIFIED)
    }

    pub fn full_name_or_default(&self) -> &str {
        self.lead.full_name.as_deref().unwrap_or(NOT_SPECIFIED)
    }

    pub fn email_or_default(&self) -> &str {
        self.lead.email.as_deref().unwrap_or(NOT_SPECIFIED)
    }
}

/// Notification channel trait
///
/// All channel implementations must implement this trait.
#[trait_variant::make(NotifyChannel: Send)]
pub trait LocalNotifyChannel {
    /// Channel name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one notification
    ///
    /// # Errors
    /// Returns send error (should include context)
    async fn send(&mut self, notification: &Notification) -> Result<(), ContractError>;

    /// Close channel
    async fn close(&mut self) -> Result<(), ContractError>;
}
