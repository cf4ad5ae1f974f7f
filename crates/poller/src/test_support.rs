use std::sync::{Arc, Mutex};

use chrono::Utc;
use contracts::{
    ContractError, LeadDraft, LeadReceipt, LeadSink, Notification, NotifyChannel,
};

/// Sink keeping every appended lead, optionally refusing some rows
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    stored: Arc<Mutex<Vec<LeadDraft>>>,
    fail_rows: Vec<usize>,
    attempts: Arc<Mutex<usize>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, row_index: usize) -> Self {
        self.fail_rows.push(row_index);
        self
    }

    pub fn stored(&self) -> Vec<LeadDraft> {
        self.stored.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl LeadSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn append(&mut self, lead: &LeadDraft) -> Result<LeadReceipt, ContractError> {
        *self.attempts.lock().unwrap() += 1;

        if self.fail_rows.contains(&lead.row_index) {
            return Err(ContractError::sink_connection("recording", "connection refused"));
        }

        let mut stored = self.stored.lock().unwrap();
        stored.push(lead.clone());
        Ok(LeadReceipt {
            id: stored.len() as i64,
            created_at: Utc::now(),
        })
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Channel keeping every notification it was asked to send
#[derive(Debug, Clone)]
pub struct RecordingChannel {
    name: String,
    received: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            received: Arc::default(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }
}

impl NotifyChannel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, notification: &Notification) -> Result<(), ContractError> {
        self.received.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(ContractError::channel_send(&self.name, "bot was blocked"));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Channel whose `send` panics, taking its worker down
#[derive(Debug, Clone, Copy)]
pub struct PanickingChannel;

impl NotifyChannel for PanickingChannel {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn send(&mut self, _notification: &Notification) -> Result<(), ContractError> {
        panic!("channel crashed while sending");
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
