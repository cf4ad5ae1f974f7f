//! ChannelHandle - manages a channel with isolated queue and worker task

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ContractError, Notification, NotifyChannel};

use crate::error::DispatcherError;

/// Outcome of one delivery, as reported by the worker
pub type DeliveryResult = Result<(), ContractError>;

/// One queued delivery
struct Request {
    notification: Arc<Notification>,
    reply: oneshot::Sender<DeliveryResult>,
}

/// Handle to a running channel worker
pub struct ChannelHandle {
    /// Channel name
    name: String,
    /// Channel to send requests to worker
    tx: mpsc::Sender<Request>,
    /// Shared metrics
    metrics: Arc<ChannelMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
    /// Set once the worker was seen to have died
    lost: AtomicBool,
}

impl ChannelHandle {
    /// Create a new ChannelHandle and spawn the worker task
    pub fn spawn<C: NotifyChannel + Send + 'static>(channel: C, queue_capacity: usize) -> Self {
        let name = channel.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(ChannelMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            channel_worker(channel, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
            lost: AtomicBool::new(false),
        }
    }

    /// Get channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ChannelMetrics> {
        &self.metrics
    }

    /// Whether the worker has died (panicked inside the channel)
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Relaxed) || self.tx.is_closed()
    }

    /// Record that the worker dropped a request without answering
    pub(crate) fn mark_lost(&self) {
        if !self.lost.swap(true, Ordering::Relaxed) {
            error!(channel = %self.name, "Channel worker died");
        }
    }

    /// Enqueue a notification (non-blocking)
    ///
    /// Returns the receiver the worker answers on once delivery was attempted.
    ///
    /// # Errors
    /// `QueueFull` when the worker is backed up, `WorkerGone` when it exited.
    pub fn try_send(
        &self,
        notification: Arc<Notification>,
    ) -> Result<oneshot::Receiver<DeliveryResult>, DispatcherError> {
        let (reply, reply_rx) = oneshot::channel();

        match self.tx.try_send(Request {
            notification,
            reply,
        }) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                Ok(reply_rx)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.inc_failure_count();
                warn!(channel = %self.name, "Queue full, notification dropped");
                Err(DispatcherError::QueueFull {
                    channel: self.name.clone(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.inc_failure_count();
                self.mark_lost();
                Err(DispatcherError::WorkerGone {
                    channel: self.name.clone(),
                })
            }
        }
    }

    /// Shutdown the channel worker gracefully
    ///
    /// Requests already queued are still delivered.
    #[instrument(name = "channel_handle_shutdown", skip(self), fields(channel = %self.name))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(channel = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(channel = %self.name, "ChannelHandle shutdown complete");
    }
}

/// Worker task that delivers queued notifications through one channel
#[instrument(
    name = "channel_worker_loop",
    skip(channel, rx, metrics),
    fields(channel = %name)
)]
async fn channel_worker<C: NotifyChannel>(
    mut channel: C,
    mut rx: mpsc::Receiver<Request>,
    metrics: Arc<ChannelMetrics>,
    name: String,
) {
    debug!(channel = %name, "Channel worker started");

    while let Some(request) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let result = channel.send(&request.notification).await;
        match &result {
            Ok(()) => metrics.inc_sent_count(),
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    channel = %name,
                    row = request.notification.lead.row_index,
                    error = %e,
                    "Send failed"
                );
            }
        }

        // The requester may have stopped waiting (timeout)
        let _ = request.reply.send(result);
    }

    if let Err(e) = channel.close().await {
        error!(channel = %name, error = %e, "Close failed on shutdown");
    }

    debug!(channel = %name, "Channel worker stopped");
}

/// Metrics for a single notification channel
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    queue_len: AtomicUsize,
    sent_count: AtomicU64,
    /// Channel errors, full queues and lost workers
    failure_count: AtomicU64,
    timeout_count: AtomicU64,
}

impl ChannelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn inc_sent_count(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeout_count.load(Ordering::Relaxed)
    }

    pub fn inc_timeout_count(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            sent_count: self.sent_count(),
            failure_count: self.failure_count(),
            timeout_count: self.timeout_count(),
        }
    }
}

/// Point-in-time copy of [`ChannelMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub sent_count: u64,
    pub failure_count: u64,
    pub timeout_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{notification, MockChannel};
    use std::sync::atomic::Ordering;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_channel_handle_basic() {
        let channel = MockChannel::new("test");
        let sent = Arc::clone(&channel.sent);
        let handle = ChannelHandle::spawn(channel, 10);

        let mut replies = Vec::new();
        for i in 0..5 {
            replies.push(handle.try_send(Arc::new(notification(i))).unwrap());
        }
        for reply in replies {
            assert!(reply.await.unwrap().is_ok());
        }

        assert_eq!(handle.metrics().sent_count(), 5);
        handle.shutdown().await;
        assert_eq!(sent.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_channel_handle_queue_full() {
        let channel = MockChannel::new("slow").with_delay(Duration::from_millis(100));
        let handle = ChannelHandle::spawn(channel, 1);

        let mut rejected = 0;
        for i in 0..5 {
            if let Err(e) = handle.try_send(Arc::new(notification(i))) {
                assert!(matches!(e, DispatcherError::QueueFull { .. }));
                rejected += 1;
            }
        }

        assert!(rejected > 0);
        assert_eq!(handle.metrics().failure_count(), rejected);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_channel_handle_failure_isolation() {
        let channel = MockChannel::new("failing").failing();
        let handle = ChannelHandle::spawn(channel, 10);

        let first = handle.try_send(Arc::new(notification(1))).unwrap();
        let second = handle.try_send(Arc::new(notification(2))).unwrap();

        assert!(matches!(
            first.await.unwrap(),
            Err(ContractError::ChannelSend { .. })
        ));
        assert!(second.await.unwrap().is_err());

        // Give worker time to update counters
        sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.metrics().failure_count(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_worker_is_reported_lost() {
        let handle = ChannelHandle::spawn(MockChannel::new("panicky").panicking(), 4);
        assert!(!handle.is_lost());

        let reply = handle.try_send(Arc::new(notification(1))).unwrap();
        assert!(reply.await.is_err());

        let second = handle.try_send(Arc::new(notification(2)));
        assert!(matches!(second, Err(DispatcherError::WorkerGone { .. })));
        assert!(handle.is_lost());

        // the panic is logged, not propagated
        handle.shutdown().await;
    }
}
