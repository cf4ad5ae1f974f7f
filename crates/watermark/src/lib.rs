//! # Watermark
//!
//! Per-view progress of the poller: how many rows (header included) of a
//! sheet view were already consumed.
//!
//! - [`FileWatermarkStore`]: JSON object on disk, rewritten on every update
//! - [`MemoryWatermarkStore`]: process-local, for tests and dry runs

mod file;
mod memory;

pub use file::FileWatermarkStore;
pub use memory::MemoryWatermarkStore;

use contracts::{ContractError, WatermarkKey};

/// Watermark persistence
///
/// The in-memory value is updated before persisting, so a failed write still
/// leaves the new watermark in effect for the rest of the process lifetime.
pub trait WatermarkStore: Send {
    /// Rows consumed for `key`; [`INITIAL_WATERMARK`](contracts::INITIAL_WATERMARK) if unseen
    fn last_row(&self, key: &WatermarkKey) -> usize;

    /// Record that rows up to `row` (exclusive) were consumed
    ///
    /// # Errors
    /// `StatePersist` when the new value could not be written durably.
    fn set_last_row(&mut self, key: &WatermarkKey, row: usize) -> Result<(), ContractError>;

    /// All stored `(storage key, watermark)` pairs, sorted by key
    fn entries(&self) -> Vec<(String, usize)>;
}

impl<T: WatermarkStore + ?Sized> WatermarkStore for Box<T> {
    fn last_row(&self, key: &WatermarkKey) -> usize {
        (**self).last_row(key)
    }

    fn set_last_row(&mut self, key: &WatermarkKey, row: usize) -> Result<(), ContractError> {
        (**self).set_last_row(key, row)
    }

    fn entries(&self) -> Vec<(String, usize)> {
        (**self).entries()
    }
}
