//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Channel could not be built from its configuration
    #[error("failed to create channel '{name}': {message}")]
    ChannelCreation { name: String, message: String },

    /// Queue full - notification not enqueued
    #[error("queue full for channel '{channel}', notification dropped")]
    QueueFull { channel: String },

    /// Worker task ended while the notifier still holds its handle
    #[error("worker for channel '{channel}' is gone")]
    WorkerGone { channel: String },

    /// Channel error (from contract)
    #[error("channel error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a channel creation error
    pub fn channel_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
