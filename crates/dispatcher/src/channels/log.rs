//! LogChannel - logs notification summary via tracing

use contracts::{ContractError, Notification, NotifyChannel};
use tracing::{info, instrument};

/// Channel that logs every notification, for debugging and dry runs
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    /// Create a new LogChannel with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl NotifyChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_channel_send",
        skip(self, notification),
        fields(channel = %self.name, row = notification.lead.row_index)
    )]
    async fn send(&mut self, notification: &Notification) -> Result<(), ContractError> {
        info!(
            channel = %self.name,
            captured_at = notification.captured_at_or_default(),
            full_name = notification.full_name_or_default(),
            email = notification.email_or_default(),
            columns = notification.lead.submission.len(),
            processed_at = %notification.processed_at_display(),
            "New lead"
        );
        Ok(())
    }

    #[instrument(name = "log_channel_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(channel = %self.name, "LogChannel closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::notification;

    #[tokio::test]
    async fn test_log_channel_send() {
        let mut channel = LogChannel::new("test_log");
        assert!(channel.send(&notification(1)).await.is_ok());
        assert_eq!(channel.name(), "test_log");
    }
}
