//! Notifier - bounded fan-out of one notification to every channel

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{error, info, instrument, warn};

use contracts::{ContractError, Notification, NotifyConfig};

use crate::channels::{EmailChannel, LogChannel, TelegramChannel};
use crate::handle::{ChannelHandle, MetricsSnapshot};

/// How one channel fared with one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed(String),
    TimedOut,
}

impl DeliveryStatus {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

const WORKER_GONE: &str = "worker gone";

/// Per-channel result of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: String,
    pub status: DeliveryStatus,
}

/// Result of [`Notifier::dispatch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    fn push(&mut self, channel: &str, status: DeliveryStatus) {
        self.outcomes.push(ChannelOutcome {
            channel: channel.to_string(),
            status,
        });
    }

    pub fn sent(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Sent))
    }

    /// Failed deliveries, timeouts included
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    pub fn timed_out(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::TimedOut))
    }

    fn count(&self, pred: impl Fn(&DeliveryStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Fans notifications out to channel workers and joins their replies
pub struct Notifier {
    handles: Vec<ChannelHandle>,
    send_timeout: Duration,
}

impl Notifier {
    /// Create a notifier over already spawned handles
    pub fn with_handles(handles: Vec<ChannelHandle>, send_timeout: Duration) -> Self {
        Self {
            handles,
            send_timeout,
        }
    }

    /// Build and spawn every configured channel
    ///
    /// A channel whose configuration is absent is not built. A channel that
    /// fails to build is logged and skipped.
    #[instrument(name = "notifier_from_config", skip(config))]
    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut handles = Vec::new();
        let capacity = config.queue_capacity;

        match config.telegram_enabled() {
            Some(telegram) => match TelegramChannel::new(telegram, config.send_timeout()) {
                Ok(channel) => handles.push(ChannelHandle::spawn(channel, capacity)),
                Err(e) => error!(error = %e, "Telegram channel disabled"),
            },
            None => info!("Telegram notifications disabled (token or chat id not set)"),
        }

        match config.email_enabled() {
            Some(email) => match EmailChannel::new(email) {
                Ok(channel) => handles.push(ChannelHandle::spawn(channel, capacity)),
                Err(e) => error!(error = %e, "Email channel disabled"),
            },
            None => info!("Email notifications disabled (no recipient)"),
        }

        if config.log {
            handles.push(ChannelHandle::spawn(LogChannel::new("log"), capacity));
        }

        let notifier = Self::with_handles(handles, config.send_timeout());
        info!(channels = ?notifier.channel_names(), "Notifier ready");
        notifier
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.handles.iter().map(ChannelHandle::name).collect()
    }

    /// Get metrics for all channels
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Channels whose worker has died
    pub fn lost_channels(&self) -> Vec<&str> {
        self.handles
            .iter()
            .filter(|h| h.is_lost())
            .map(ChannelHandle::name)
            .collect()
    }

    /// Deliver one notification through every channel
    ///
    /// All channels work concurrently; the call returns once each has answered
    /// or the send timeout elapsed. Every failure, a dead worker included, is
    /// reported for its channel only.
    #[instrument(
        name = "notifier_dispatch",
        skip(self, notification),
        fields(row = notification.lead.row_index, channels = self.handles.len())
    )]
    pub async fn dispatch(&self, notification: Notification) -> DispatchReport {
        let notification = Arc::new(notification);
        let deadline = Instant::now() + self.send_timeout;
        let mut report = DispatchReport::default();
        let mut pending = Vec::with_capacity(self.handles.len());

        for handle in &self.handles {
            match handle.try_send(Arc::clone(&notification)) {
                Ok(reply) => pending.push((handle, reply)),
                Err(e) => report.push(handle.name(), DeliveryStatus::Failed(e.to_string())),
            }
        }

        for (handle, reply) in pending {
            let status = match timeout_at(deadline, reply).await {
                Ok(Ok(Ok(()))) => DeliveryStatus::Sent,
                Ok(Ok(Err(e))) => DeliveryStatus::Failed(e.to_string()),
                Ok(Err(_)) => {
                    // reply dropped unanswered: the worker died mid-send
                    handle.metrics().inc_failure_count();
                    handle.mark_lost();
                    DeliveryStatus::Failed(WORKER_GONE.to_string())
                }
                Err(_) => {
                    handle.metrics().inc_timeout_count();
                    let err = ContractError::ChannelTimeout {
                        channel: handle.name().to_string(),
                        waited_ms: self.send_timeout.as_millis() as u64,
                    };
                    warn!(error = %err, "Notification timed out");
                    DeliveryStatus::TimedOut
                }
            };
            report.push(handle.name(), status);
        }

        report
    }

    /// Drain queues and stop every worker
    #[instrument(name = "notifier_shutdown", skip(self))]
    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown().await;
        }
    }
}
