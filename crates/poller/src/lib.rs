//! # Poller
//!
//! Poll cycle orchestration.
//!
//! Responsibilities:
//! - Diff the fetched view against the stored watermark
//! - Persist and announce every new row, in sheet order
//! - Advance the watermark once all new rows were attempted

mod cycle;
mod error;

#[cfg(test)]
mod test_support;

pub use cycle::PollCycle;
pub use error::PollerError;
