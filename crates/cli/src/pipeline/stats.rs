//! Poller run statistics.

use std::time::Duration;

use contracts::CycleReport;
use observability::CycleStatsAggregator;

/// Statistics from a poller run
#[derive(Debug, Clone, Default)]
pub struct PollerStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Notification channels that were active
    pub channels: Vec<String>,

    /// Whether leads were persisted
    pub storage_enabled: bool,

    /// Watermark after the last cycle
    pub watermark: usize,

    /// Cycle metrics aggregator
    pub cycles: CycleStatsAggregator,
}

impl PollerStats {
    pub fn record(&mut self, report: &CycleReport) {
        self.watermark = report.watermark;
        self.cycles.update(report);
    }

    /// Leads found per hour of runtime
    pub fn leads_per_hour(&self) -> f64 {
        let hours = self.duration.as_secs_f64() / 3600.0;
        if hours > 0.0 {
            self.cycles.total_new_rows as f64 / hours
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Poller Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Watermark: {}", self.watermark);
        println!("  Leads/hour: {:.2}", self.leads_per_hour());
        println!(
            "  Storage: {}",
            if self.storage_enabled { "enabled" } else { "disabled" }
        );
        if self.channels.is_empty() {
            println!("  Channels: none");
        } else {
            println!("  Channels: {}", self.channels.join(", "));
        }

        println!("\n{}", self.cycles.summary());
    }
}
