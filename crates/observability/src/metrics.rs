//! Poll cycle metrics
//!
//! Prometheus series recorded through the `metrics` facade, plus an in-memory
//! aggregator for the shutdown summary.

use std::collections::BTreeMap;

use contracts::{CycleOutcome, CycleReport};
use metrics::{counter, gauge, histogram};

/// Record the metrics of one finished cycle
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_cycle;
///
/// let report = poller.run_cycle().await?;
/// record_cycle(&report);
/// ```
pub fn record_cycle(report: &CycleReport) {
    counter!(
        "lead_poller_cycles_total",
        "outcome" => report.outcome.as_str()
    )
    .increment(1);

    histogram!("lead_poller_cycle_duration_ms").record(report.duration.as_secs_f64() * 1000.0);

    if report.outcome == CycleOutcome::FetchFailed {
        return;
    }

    gauge!("lead_poller_rows_fetched").set(report.rows_fetched as f64);
    gauge!("lead_poller_watermark").set(report.watermark as f64);

    if report.new_rows > 0 {
        counter!("lead_poller_new_rows_total").increment(report.new_rows as u64);
    }
}

/// Record one lead persistence attempt
pub fn record_lead(stored: bool) {
    let status = if stored { "stored" } else { "failed" };
    counter!("lead_poller_leads_total", "status" => status).increment(1);
}

/// Record one channel delivery
pub fn record_notification(channel: &str, status: &str) {
    counter!(
        "lead_poller_notifications_total",
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Cycle statistics aggregator
///
/// Aggregates cycle reports in memory for the summary printed at shutdown.
#[derive(Debug, Clone, Default)]
pub struct CycleStatsAggregator {
    pub total_cycles: u64,
    pub outcome_counts: BTreeMap<&'static str, u64>,
    pub total_new_rows: u64,
    pub leads_persisted: u64,
    pub leads_failed: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    /// Cycles whose advanced watermark could not be written
    pub watermark_write_failures: u64,
    /// Cycle duration (ms)
    pub duration_stats: RunningStats,
}

impl CycleStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one report into the totals
    pub fn update(&mut self, report: &CycleReport) {
        self.total_cycles += 1;
        *self
            .outcome_counts
            .entry(report.outcome.as_str())
            .or_insert(0) += 1;

        self.total_new_rows += report.new_rows as u64;
        self.leads_persisted += report.leads_persisted as u64;
        self.leads_failed += report.leads_failed as u64;
        self.notifications_sent += report.notifications_sent as u64;
        self.notifications_failed += report.notifications_failed as u64;

        if !report.watermark_persisted {
            self.watermark_write_failures += 1;
        }

        self.duration_stats
            .push(report.duration.as_secs_f64() * 1000.0);
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            total_cycles: self.total_cycles,
            fetch_failures: self
                .outcome_counts
                .get(CycleOutcome::FetchFailed.as_str())
                .copied()
                .unwrap_or(0),
            total_new_rows: self.total_new_rows,
            leads_persisted: self.leads_persisted,
            leads_failed: self.leads_failed,
            notifications_sent: self.notifications_sent,
            notifications_failed: self.notifications_failed,
            watermark_write_failures: self.watermark_write_failures,
            cycle_duration_ms: StatsSummary::from(&self.duration_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Cycle summary
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub total_cycles: u64,
    pub fetch_failures: u64,
    pub total_new_rows: u64,
    pub leads_persisted: u64,
    pub leads_failed: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub watermark_write_failures: u64,
    pub cycle_duration_ms: StatsSummary,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Poll Cycle Summary ===")?;
        writeln!(f, "Cycles: {}", self.total_cycles)?;
        writeln!(f, "Fetch failures: {}", self.fetch_failures)?;
        writeln!(f, "New rows: {}", self.total_new_rows)?;
        writeln!(
            f,
            "Leads stored: {} (failed: {})",
            self.leads_persisted, self.leads_failed
        )?;
        writeln!(
            f,
            "Notifications sent: {} (failed: {})",
            self.notifications_sent, self.notifications_failed
        )?;
        if self.watermark_write_failures > 0 {
            writeln!(f, "Watermark write failures: {}", self.watermark_write_failures)?;
        }
        writeln!(f, "Cycle duration (ms): {}", self.cycle_duration_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
