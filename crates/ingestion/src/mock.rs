//! Mock row source
//!
//! For tests without Google credentials. Replays a scripted queue of results;
//! once the script is exhausted the last row set is repeated.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{ContractError, RowSet, RowSource, WatermarkKey};
use tracing::trace;

/// One scripted fetch result
enum Scripted {
    Rows(RowSet),
    /// Error factory; `ContractError` is not `Clone`
    Failure(Box<dyn Fn(&WatermarkKey) -> ContractError + Send>),
}

#[derive(Default)]
struct Script {
    queue: VecDeque<Scripted>,
    last_rows: RowSet,
}

/// Scripted row source
///
/// Clones share the script and the fetch counter, so a test can keep a clone
/// and feed new rows while the poller owns the other.
#[derive(Clone, Default)]
pub struct MockRowSource {
    script: Arc<Mutex<Script>>,
    fetches: Arc<AtomicU64>,
}

impl MockRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source that always returns `rows`
    pub fn with_rows(rows: RowSet) -> Self {
        let source = Self::new();
        source.push_rows(rows);
        source
    }

    /// Queue a successful fetch
    pub fn push_rows(&self, rows: RowSet) {
        self.script().queue.push_back(Scripted::Rows(rows));
    }

    /// Queue a failed fetch
    pub fn push_failure<F>(&self, make_error: F)
    where
        F: Fn(&WatermarkKey) -> ContractError + Send + 'static,
    {
        self.script()
            .queue
            .push_back(Scripted::Failure(Box::new(make_error)));
    }

    /// Queue an `AccessDenied` failure
    pub fn push_access_denied(&self) {
        self.push_failure(|key| ContractError::AccessDenied {
            sheet_id: key.sheet_id.clone(),
        });
    }

    /// Number of fetches so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RowSource for MockRowSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&mut self, key: &WatermarkKey) -> Result<RowSet, ContractError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let mut script = self.script();
        match script.queue.pop_front() {
            Some(Scripted::Rows(rows)) => {
                trace!(key = %key, rows = rows.len(), "mock fetch");
                script.last_rows = rows.clone();
                Ok(rows)
            }
            Some(Scripted::Failure(make_error)) => Err(make_error(key)),
            None => Ok(script.last_rows.clone()),
        }
    }
}
