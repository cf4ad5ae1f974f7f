//! PollCycle - one fetch, diff, persist, notify, advance pass

use std::time::Instant;

use chrono::Local;
use contracts::{
    ColumnMapping, CycleOutcome, CycleReport, LeadDraft, LeadSink, Notification, RowSource,
    Submission, WatermarkKey,
};
use dispatcher::{DeliveryStatus, Notifier};
use observability::{record_cycle, record_lead, record_notification};
use tracing::{debug, error, info, instrument, warn};
use watermark::WatermarkStore;

use crate::error::PollerError;

/// Poll cycle orchestrator for one sheet view
///
/// `run_cycle` takes `&mut self`, so cycles never overlap.
pub struct PollCycle<S, L, W> {
    key: WatermarkKey,
    columns: ColumnMapping,
    source: S,
    /// `None` when storage is disabled
    sink: Option<L>,
    watermarks: W,
    notifier: Notifier,
}

impl<S, L, W> PollCycle<S, L, W>
where
    S: RowSource,
    L: LeadSink,
    W: WatermarkStore,
{
    pub fn new(
        key: WatermarkKey,
        columns: ColumnMapping,
        source: S,
        sink: Option<L>,
        watermarks: W,
        notifier: Notifier,
    ) -> Self {
        Self {
            key,
            columns,
            source,
            sink,
            watermarks,
            notifier,
        }
    }

    pub fn key(&self) -> &WatermarkKey {
        &self.key
    }

    /// Current watermark of the polled view
    pub fn watermark(&self) -> usize {
        self.watermarks.last_row(&self.key)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Run one poll cycle
    ///
    /// Fetch failures, failed appends and failed deliveries are logged and
    /// reported, never returned.
    ///
    /// # Errors
    /// `ChannelLost` when a channel worker died. The cycle still ran to the
    /// end, watermark included.
    #[instrument(name = "poll_cycle", skip(self), fields(key = %self.key))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport, PollerError> {
        let started = Instant::now();

        let mut report = self.poll().await;
        report.duration = started.elapsed();

        record_cycle(&report);
        info!(
            outcome = %report.outcome,
            new_rows = report.new_rows,
            watermark = report.watermark,
            duration_ms = report.duration.as_millis() as u64,
            "Poll cycle finished"
        );

        let lost = self.notifier.lost_channels();
        if !lost.is_empty() {
            return Err(PollerError::ChannelLost {
                channels: lost.join(", "),
            });
        }
        Ok(report)
    }

    async fn poll(&mut self) -> CycleReport {
        let previous = self.watermarks.last_row(&self.key);

        let rows = match self.source.fetch(&self.key).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(source = self.source.name(), error = %e, "Failed to fetch rows");
                let mut report = CycleReport::unchanged(CycleOutcome::FetchFailed, previous);
                report.error = Some(e.to_string());
                return report;
            }
        };

        let Some(header) = rows.header() else {
            info!("Sheet view has no data");
            return CycleReport::unchanged(CycleOutcome::Empty, previous);
        };

        if rows.len() <= previous {
            debug!(rows = rows.len(), watermark = previous, "No new rows");
            let mut report = CycleReport::unchanged(CycleOutcome::NoNewRows, previous);
            report.rows_fetched = rows.len();
            return report;
        }

        let mut report = CycleReport::unchanged(CycleOutcome::Processed, previous);
        report.rows_fetched = rows.len();
        report.new_rows = rows.len() - previous;
        info!(new_rows = report.new_rows, "Found new rows");

        for (row_index, row) in rows.rows_from(previous) {
            let submission = Submission::from_row(header, row);
            let lead = LeadDraft::from_submission(row_index, submission, &self.columns);

            self.persist(&lead, &mut report).await;
            self.notify(lead, &mut report).await;
        }

        report.watermark = rows.len();
        if let Err(e) = self.watermarks.set_last_row(&self.key, report.watermark) {
            error!(
                watermark = report.watermark,
                error = %e,
                "Failed to persist watermark, keeping it in memory"
            );
            report.watermark_persisted = false;
        }

        report
    }

    async fn persist(&mut self, lead: &LeadDraft, report: &mut CycleReport) {
        let Some(sink) = self.sink.as_mut() else {
            debug!(row = lead.row_index, "Storage disabled, lead not persisted");
            return;
        };

        match sink.append(lead).await {
            Ok(receipt) => {
                report.leads_persisted += 1;
                record_lead(true);
                info!(
                    row = lead.row_index,
                    id = receipt.id,
                    lead = lead.label(),
                    "Lead stored"
                );
            }
            Err(e) => {
                report.leads_failed += 1;
                record_lead(false);
                error!(
                    row = lead.row_index,
                    sink = sink.name(),
                    error = %e,
                    "Failed to store lead"
                );
            }
        }
    }

    async fn notify(&self, lead: LeadDraft, report: &mut CycleReport) {
        let row = lead.row_index;
        let dispatched = self
            .notifier
            .dispatch(Notification::new(lead, Local::now()))
            .await;

        for outcome in &dispatched.outcomes {
            record_notification(&outcome.channel, outcome.status.as_str());
            if let DeliveryStatus::Failed(reason) = &outcome.status {
                warn!(row, channel = %outcome.channel, error = %reason, "Notification failed");
            }
        }

        report.notifications_sent += dispatched.sent();
        report.notifications_failed += dispatched.failed();
    }

    /// Close the sink and stop every channel worker
    #[instrument(name = "poll_cycle_shutdown", skip(self), fields(key = %self.key))]
    pub async fn shutdown(mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.close().await {
                warn!(sink = sink.name(), error = %e, "Failed to close sink");
            }
        }
        self.notifier.shutdown().await;
    }
}
