//! # Contracts
//!
//! Frozen interface contracts shared by every lead-poller crate: the row and
//! lead data model, the source / sink / channel traits, the configuration
//! model and the error taxonomy.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Row Model
//! - Record 0 of a [`RowSet`] is the header, records `1..N` are data rows
//! - A [`Watermark`](WatermarkKey) counts consumed rows *including* the header

mod channel;
mod config;
mod cycle;
mod error;
mod lead;
mod row;
mod row_source;
mod sink;
mod submission;

pub use channel::*;
pub use config::*;
pub use cycle::{CycleOutcome, CycleReport};
pub use error::*;
pub use lead::*;
pub use row::{RowSet, WatermarkKey, INITIAL_WATERMARK};
pub use row_source::*;
pub use sink::*;
pub use submission::Submission;
