//! Poller error definitions

use thiserror::Error;

/// Failures that abort the poller, not just one cycle
#[derive(Debug, Error)]
pub enum PollerError {
    /// A channel worker died; reported once the cycle and its watermark are done
    #[error("notification channel worker lost: {channels}")]
    ChannelLost { channels: String },
}
