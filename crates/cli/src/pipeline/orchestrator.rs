//! Poller orchestrator - builds the components and drives the poll timer.

use std::future::Future;
use std::time::{Duration, Instant};

use contracts::{CycleReport, LeadSink, LeadsConfig, RowSource};
use dispatcher::{ChannelHandle, LogChannel, Notifier};
use ingestion::SheetsRowSource;
use lead_store::LeadStore;
use poller::PollCycle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use watermark::{FileWatermarkStore, MemoryWatermarkStore, WatermarkStore};

use super::PollerStats;
use crate::error::{CliError, Result};

/// Poller wired to Google Sheets
pub type LivePoller = Poller<SheetsRowSource, LeadStore, Box<dyn WatermarkStore>>;

/// Build the poller described by `config`
///
/// A dry run keeps the watermark in memory (seeded from the state file),
/// stores nothing and only logs notifications.
pub fn build_poller(config: &LeadsConfig, dry_run: bool) -> Result<LivePoller> {
    let key = config.watermark_key();
    let source = SheetsRowSource::new(&config.source).map_err(CliError::SourceSetup)?;
    let state = FileWatermarkStore::open(&config.state.path);

    let (sink, watermarks, notifier): (_, Box<dyn WatermarkStore>, _) = if dry_run {
        info!("Dry run: watermark kept in memory, storage skipped, notifications logged");
        let seeded = MemoryWatermarkStore::new().with_entry(&key, state.last_row(&key));
        let log = ChannelHandle::spawn(LogChannel::new("log"), config.notify.queue_capacity);
        (
            None,
            Box::new(seeded),
            Notifier::with_handles(vec![log], config.notify.send_timeout()),
        )
    } else {
        (
            LeadStore::from_config(&config.storage).map_err(CliError::StorageSetup)?,
            Box::new(state),
            Notifier::from_config(&config.notify),
        )
    };

    let storage_enabled = sink.is_some();
    let cycle = PollCycle::new(
        key,
        config.columns.clone(),
        source,
        sink,
        watermarks,
        notifier,
    );

    Ok(Poller::new(cycle, config.schedule.interval(), storage_enabled))
}

/// Main poller orchestrator
pub struct Poller<S, L, W> {
    cycle: PollCycle<S, L, W>,
    interval: Duration,
    storage_enabled: bool,
}

impl<S, L, W> Poller<S, L, W>
where
    S: RowSource,
    L: LeadSink,
    W: WatermarkStore,
{
    pub fn new(cycle: PollCycle<S, L, W>, interval: Duration, storage_enabled: bool) -> Self {
        Self {
            cycle,
            interval,
            storage_enabled,
        }
    }

    /// Run a single cycle, then release every component
    pub async fn run_once(mut self) -> Result<CycleReport> {
        let result = self.cycle.run_cycle().await;
        self.cycle.shutdown().await;
        Ok(result?)
    }

    /// Poll until `shutdown` resolves
    ///
    /// The first cycle starts immediately. A cycle that outlasts the interval
    /// delays the next tick instead of bursting.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<PollerStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let mut stats = PollerStats {
            channels: self
                .cycle
                .notifier()
                .channel_names()
                .into_iter()
                .map(String::from)
                .collect(),
            storage_enabled: self.storage_enabled,
            watermark: self.cycle.watermark(),
            ..Default::default()
        };

        info!(
            key = %self.cycle.key(),
            interval_secs = self.interval.as_secs(),
            watermark = stats.watermark,
            channels = ?stats.channels,
            "Poller started"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping poller...");
                    break Ok(());
                }
                _ = ticker.tick() => {
                    match self.cycle.run_cycle().await {
                        Ok(report) => stats.record(&report),
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        self.cycle.shutdown().await;
        stats.duration = start_time.elapsed();

        outcome?;
        Ok(stats)
    }
}
