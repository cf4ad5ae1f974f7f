//! Poller orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{build_poller, Poller};
pub use stats::PollerStats;
