//! CycleReport - Poll Cycle output

use std::fmt;
use std::time::Duration;

/// How a poll cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
    /// The row source failed; nothing was changed
    FetchFailed,
    /// The view has no rows at all
    Empty,
    /// Nothing past the watermark
    NoNewRows,
    /// New rows were processed and the watermark advanced
    Processed,
}

impl CycleOutcome {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchFailed => "fetch_failed",
            Self::Empty => "empty",
            Self::NoNewRows => "no_new_rows",
            Self::Processed => "processed",
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one poll cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Records fetched, header included
    pub rows_fetched: usize,
    /// Watermark before the cycle
    pub previous_watermark: usize,
    /// Watermark after the cycle
    pub watermark: usize,
    /// Data rows past the previous watermark
    pub new_rows: usize,
    pub leads_persisted: usize,
    pub leads_failed: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
    /// False when the advanced watermark could not be written durably
    pub watermark_persisted: bool,
    /// Fetch error, for `FetchFailed`
    pub error: Option<String>,
    pub duration: Duration,
}

impl CycleReport {
    /// Report of a cycle that changed nothing
    pub fn unchanged(outcome: CycleOutcome, watermark: usize) -> Self {
        Self {
            outcome,
            rows_fetched: 0,
            previous_watermark: watermark,
            watermark,
            new_rows: 0,
            leads_persisted: 0,
            leads_failed: 0,
            notifications_sent: 0,
            notifications_failed: 0,
            watermark_persisted: true,
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn advanced(&self) -> bool {
        self.watermark > self.previous_watermark
    }
}
