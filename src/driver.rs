//! Day-sequenced sync driver.
//!
//! Walks a date range one local calendar day at a time, oldest first.
//! Within a day all metric uploads run concurrently; the walk only
//! advances once the whole day has settled. A failed upload is logged
//! and counted but never stops the run.

use crate::aggregate::{reconstruct_night, Aggregator, DailySleepRecord, MetricBatch};
use crate::stats::SharedSyncStats;
use crate::store::MetricKind;
use crate::upload::{SyncClient, SyncError};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One unit of upload work for a single day.
#[derive(Debug, Clone)]
pub enum DayBatch {
    Quantity(MetricBatch),
    Sleep(DailySleepRecord),
}

impl DayBatch {
    /// The metric this batch belongs to.
    pub fn kind(&self) -> MetricKind {
        match self {
            DayBatch::Quantity(batch) => batch.kind,
            DayBatch::Sleep(_) => MetricKind::Sleep,
        }
    }
}

/// Per-metric upload counters for one sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricCounters {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Outcome of one sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Number of calendar days walked
    pub days_walked: u64,
    /// Upload counters keyed by metric
    pub counters: BTreeMap<MetricKind, MetricCounters>,
}

impl SyncReport {
    /// True when every attempted upload succeeded.
    pub fn success(&self) -> bool {
        self.counters.values().all(|c| c.failed == 0)
    }

    /// Total uploads attempted across all metrics.
    pub fn total_attempted(&self) -> u64 {
        self.counters.values().map(|c| c.attempted).sum()
    }

    /// One-line-per-metric summary for display.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Days walked: {}", self.days_walked)];
        for (kind, counters) in &self.counters {
            lines.push(format!(
                "  {}: {} uploaded, {} failed",
                kind, counters.succeeded, counters.failed
            ));
        }
        lines.push(format!(
            "Result: {}",
            if self.success() { "ok" } else { "incomplete" }
        ));
        lines.join("\n")
    }

    fn record(&mut self, kind: MetricKind, ok: bool) {
        let counters = self.counters.entry(kind).or_default();
        counters.attempted += 1;
        if ok {
            counters.succeeded += 1;
        } else {
            counters.failed += 1;
        }
    }
}

/// Drives the day walk across the aggregator and upload client.
pub struct SyncDriver {
    aggregator: Aggregator,
    client: SyncClient,
    metrics: Vec<MetricKind>,
    stats: Option<SharedSyncStats>,
}

impl SyncDriver {
    /// Create a driver that syncs every known metric.
    pub fn new(aggregator: Aggregator, client: SyncClient) -> Self {
        Self {
            aggregator,
            client,
            metrics: MetricKind::ALL.to_vec(),
            stats: None,
        }
    }

    /// Restrict the driver to a subset of metrics.
    pub fn with_metrics(mut self, metrics: Vec<MetricKind>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Attach a stats log updated as the run progresses.
    pub fn with_stats(mut self, stats: SharedSyncStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Walk the days from `start` to `end` inclusive and upload each
    /// day's batches.
    ///
    /// Returns an error only when the run cannot start at all, such as
    /// missing credentials. Individual upload failures are reflected in
    /// the report instead.
    pub async fn run(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        if !self.client.has_credentials() {
            return Err(SyncError::Config(
                "no credentials configured, skipping sync".to_string(),
            ));
        }

        let tz = self.aggregator.timezone();
        let first_day = start.with_timezone(&tz).date_naive();
        let last_day = end.with_timezone(&tz).date_naive();

        let mut report = SyncReport::default();
        let mut day = first_day;

        info!(
            run_id = self.client.run_id(),
            %first_day,
            %last_day,
            metrics = self.metrics.len(),
            "starting sync run"
        );

        while day <= last_day {
            let batches = self.collect_day(day).await;
            self.upload_day(batches, &mut report).await;

            report.days_walked += 1;
            if let Some(ref stats) = self.stats {
                stats.record_day_walked();
            }

            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        info!(
            run_id = self.client.run_id(),
            days = report.days_walked,
            attempted = report.total_attempted(),
            success = report.success(),
            "sync run finished"
        );

        Ok(report)
    }

    /// Gather every non-empty batch for one day.
    async fn collect_day(&self, day: chrono::NaiveDate) -> Vec<DayBatch> {
        let mut batches = Vec::new();

        for &kind in &self.metrics {
            match kind {
                MetricKind::Sleep => {
                    let intervals = self.aggregator.night_intervals(day).await;
                    if let Some(record) =
                        reconstruct_night(day, &intervals, self.aggregator.timezone())
                    {
                        batches.push(DayBatch::Sleep(record));
                    }
                }
                _ => {
                    if let Some(batch) = self.aggregator.day_batch(kind, day).await {
                        if let Some(ref stats) = self.stats {
                            stats.record_samples_read(batch.readings.len() as u64);
                        }
                        batches.push(DayBatch::Quantity(batch));
                    }
                }
            }
        }

        batches
    }

    /// Upload one day's batches concurrently and fold the outcomes into
    /// the report.
    async fn upload_day(&self, batches: Vec<DayBatch>, report: &mut SyncReport) {
        let uploads = batches.into_iter().map(|batch| async move {
            let kind = batch.kind();
            let result = match &batch {
                DayBatch::Quantity(quantity) => self.client.upload_quantity(quantity).await,
                DayBatch::Sleep(sleep) => self.client.upload_sleep(sleep).await,
            };
            (kind, result)
        });

        for (kind, result) in join_all(uploads).await {
            match result {
                Ok(()) => {
                    if let Some(ref stats) = self.stats {
                        stats.record_batch_uploaded();
                    }
                    report.record(kind, true);
                }
                Err(e) => {
                    warn!(
                        run_id = self.client.run_id(),
                        metric = %kind,
                        error = %e,
                        "batch upload failed"
                    );
                    if let Some(ref stats) = self.stats {
                        stats.record_upload_failure();
                    }
                    report.record(kind, false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success() {
        let mut report = SyncReport::default();
        report.record(MetricKind::Steps, true);
        report.record(MetricKind::HeartRate, true);
        assert!(report.success());

        report.record(MetricKind::HeartRate, false);
        assert!(!report.success());
        assert_eq!(report.total_attempted(), 3);
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = SyncReport::default();
        assert!(report.success());
        assert_eq!(report.total_attempted(), 0);
    }

    #[test]
    fn test_report_counters_per_metric() {
        let mut report = SyncReport::default();
        report.record(MetricKind::Steps, true);
        report.record(MetricKind::Steps, false);

        let counters = report.counters[&MetricKind::Steps];
        assert_eq!(counters.attempted, 2);
        assert_eq!(counters.succeeded, 1);
        assert_eq!(counters.failed, 1);
    }

    #[test]
    fn test_summary_mentions_result() {
        let mut report = SyncReport::default();
        report.days_walked = 2;
        report.record(MetricKind::Steps, false);

        let summary = report.summary();
        assert!(summary.contains("Days walked: 2"));
        assert!(summary.contains("incomplete"));
    }

    #[test]
    fn test_day_batch_kind() {
        use crate::store::RawSample;
        use chrono::NaiveDate;

        let batch = DayBatch::Quantity(MetricBatch {
            kind: MetricKind::HeartRateVariability,
            day: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            readings: Vec::<RawSample>::new(),
        });
        assert_eq!(batch.kind(), MetricKind::HeartRateVariability);
    }
}
