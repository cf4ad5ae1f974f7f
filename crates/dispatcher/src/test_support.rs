//! Shared fixtures for dispatcher tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use contracts::{
    ColumnMapping, ContractError, LeadDraft, Notification, NotifyChannel, Submission,
};
use tokio::time::sleep;

/// Mock channel for testing
pub struct MockChannel {
    name: String,
    pub sent: Arc<AtomicU64>,
    should_fail: bool,
    should_panic: bool,
    delay: Duration,
}

impl MockChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sent: Arc::new(AtomicU64::new(0)),
            should_fail: false,
            should_panic: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Panics inside `send`, killing its worker
    pub fn panicking(mut self) -> Self {
        self.should_panic = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl NotifyChannel for MockChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, _notification: &Notification) -> Result<(), ContractError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.should_panic {
            panic!("channel '{}' crashed", self.name);
        }
        if self.should_fail {
            return Err(ContractError::channel_send(&self.name, "mock failure"));
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

pub fn columns() -> ColumnMapping {
    ColumnMapping {
        timestamp: "Time".into(),
        full_name: "Name".into(),
        email: "Email".into(),
    }
}

/// Notification for data row `row_index` with fixed processing time
pub fn notification(row_index: usize) -> Notification {
    let submission = Submission::from_iter([
        ("Time", "01.02.2024 10:00:00"),
        ("Name", "Alice <Admin>"),
        ("Email", "a@x.com"),
    ]);
    let lead = LeadDraft::from_submission(row_index, submission, &columns());
    let processed_at = Local
        .with_ymd_and_hms(2024, 2, 1, 10, 0, 30)
        .single()
        .unwrap_or_else(Local::now);
    Notification::new(lead, processed_at)
}
