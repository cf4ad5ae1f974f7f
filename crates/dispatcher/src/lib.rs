//! # Dispatcher
//!
//! Notification fan-out.
//!
//! Responsibilities:
//! - Run one worker per notification channel with its own bounded queue
//! - Deliver each notification to every channel concurrently
//! - Join all deliveries, each bounded by the send timeout
//! - Isolate failing or slow channels from each other

pub mod channels;
pub mod error;
pub mod handle;
pub mod notifier;

#[cfg(test)]
mod test_support;

pub use channels::{EmailChannel, LogChannel, TelegramChannel};
pub use contracts::{Notification, NotifyChannel};
pub use error::DispatcherError;
pub use handle::{ChannelHandle, ChannelMetrics, DeliveryResult, MetricsSnapshot};
pub use notifier::{ChannelOutcome, DeliveryStatus, DispatchReport, Notifier};
