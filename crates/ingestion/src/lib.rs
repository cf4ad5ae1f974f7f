//! # Ingestion
//!
//! Row sources for the poll cycle.
//!
//! Responsibilities:
//! - Fetch the full contents of one sheet view as a [`RowSet`](contracts::RowSet)
//! - Map API failures onto the fetch error kinds of `ContractError`
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::RowSource;
//! use ingestion::SheetsRowSource;
//!
//! let mut source = SheetsRowSource::new(&config.source)?;
//! let rows = source.fetch(&config.watermark_key()).await?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockRowSource;
//!
//! let source = MockRowSource::with_rows(rows);
//! source.push_access_denied();
//! ```

mod mock;
mod sheets;

pub use mock::MockRowSource;
pub use sheets::{SheetsRowSource, DEFAULT_API_BASE};
