//! Sample aggregation: unit normalization and day bucketing.
//!
//! The aggregator reads raw quantity samples through the [`HealthStore`]
//! seam, converts each reading to the canonical unit for its metric kind,
//! and groups results by local calendar day for upload.
//!
//! Failure policy is fail-open: a denied or failed store query is logged
//! and collapses to an empty result, because absence of health data is an
//! expected, non-exceptional state on the device.

use crate::aggregate::{day_bounds, fetch_window};
use crate::store::{HealthStore, MetricKind, QuantitySample, RawSample, SleepInterval};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// One upload unit: a day's normalized readings for a single metric kind.
#[derive(Debug, Clone)]
pub struct MetricBatch {
    /// Metric kind the readings belong to
    pub kind: MetricKind,
    /// Local calendar day the readings fall on
    pub day: NaiveDate,
    /// Readings in ascending timestamp order, canonical unit
    pub readings: Vec<RawSample>,
}

/// Reads and normalizes samples from a health store.
pub struct Aggregator {
    store: Arc<dyn HealthStore>,
    tz: Tz,
}

impl Aggregator {
    /// Create an aggregator over a store, bucketing days in `tz`.
    pub fn new(store: Arc<dyn HealthStore>, tz: Tz) -> Self {
        Self { store, tz }
    }

    /// The timezone used for day bucketing.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Fetch normalized samples of one metric kind within a time range,
    /// ordered by ascending timestamp.
    pub async fn range_samples(
        &self,
        kind: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<RawSample> {
        let raw = match self.store.quantity_samples(kind, start, end).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(metric = %kind, error = %e, "store query failed, treating as empty");
                return Vec::new();
            }
        };
        self.normalize(kind, raw)
    }

    /// Fetch normalized samples over the last `days` days before `reference`.
    pub async fn lookback_samples(
        &self,
        kind: MetricKind,
        days: u32,
        reference: DateTime<Utc>,
    ) -> Vec<RawSample> {
        let start = reference - Duration::days(i64::from(days));
        self.range_samples(kind, start, reference).await
    }

    /// Fetch normalized samples for one local calendar day.
    pub async fn day_samples(&self, kind: MetricKind, day: NaiveDate) -> Vec<RawSample> {
        let (start, end) = day_bounds(day, self.tz);
        self.range_samples(kind, start, end).await
    }

    /// Assemble a day's upload batch for one metric kind.
    ///
    /// Returns `None` when the day has no readings: no batch is created
    /// for zero data.
    pub async fn day_batch(&self, kind: MetricKind, day: NaiveDate) -> Option<MetricBatch> {
        let readings = self.day_samples(kind, day).await;
        if readings.is_empty() {
            return None;
        }
        Some(MetricBatch {
            kind,
            day,
            readings,
        })
    }

    /// Fetch the raw sleep-stage intervals for `day`'s fixed fetch window
    /// (20:00 previous day through 12:00 current day).
    pub async fn night_intervals(&self, day: NaiveDate) -> Vec<SleepInterval> {
        let (start, end) = fetch_window(day, self.tz);
        match self.store.sleep_intervals(start, end).await {
            Ok(intervals) => intervals,
            Err(e) => {
                tracing::warn!(%day, error = %e, "sleep query failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Convert source-unit samples to the metric kind's canonical unit.
    ///
    /// Samples in a unit with no conversion to the canonical one are
    /// logged and skipped.
    fn normalize(&self, kind: MetricKind, samples: Vec<QuantitySample>) -> Vec<RawSample> {
        let Some(canonical) = kind.canonical_unit() else {
            return Vec::new();
        };

        let mut out: Vec<RawSample> = samples
            .into_iter()
            .filter_map(|s| match s.unit.convert(s.value, canonical) {
                Some(value) => Some(RawSample {
                    timestamp: s.timestamp,
                    value,
                }),
                None => {
                    tracing::warn!(
                        metric = %kind,
                        unit = ?s.unit,
                        "sample unit has no conversion to canonical unit, skipping"
                    );
                    None
                }
            })
            .collect();
        out.sort_by_key(|s| s.timestamp);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SleepStage, Unit};
    use chrono::{FixedOffset, TimeZone};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[tokio::test]
    async fn test_normalization_converts_units() {
        let mut store = MemoryStore::new();
        let t = offset();
        // HRV recorded in seconds, canonical unit is milliseconds
        store.insert_sample(
            MetricKind::HeartRateVariability,
            t.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            0.045,
            Unit::Seconds,
        );

        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);
        let samples = agg
            .day_samples(MetricKind::HeartRateVariability, day())
            .await;
        assert_eq!(samples.len(), 1);
        assert!((samples[0].value - 45.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unconvertible_unit_is_skipped() {
        let mut store = MemoryStore::new();
        let t = offset();
        store.insert_sample(
            MetricKind::HeartRate,
            t.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            37.0,
            Unit::Celsius,
        );
        store.insert_sample(
            MetricKind::HeartRate,
            t.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
            62.0,
            Unit::BeatsPerMinute,
        );

        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);
        let samples = agg.day_samples(MetricKind::HeartRate, day()).await;
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 62.0);
    }

    #[tokio::test]
    async fn test_empty_day_yields_no_batch() {
        let store = MemoryStore::new();
        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);
        assert!(agg.day_batch(MetricKind::Steps, day()).await.is_none());
    }

    #[tokio::test]
    async fn test_query_failure_collapses_to_empty() {
        let mut store = MemoryStore::new();
        store.fail_queries();
        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);

        assert!(agg.day_samples(MetricKind::HeartRate, day()).await.is_empty());
        assert!(agg.night_intervals(day()).await.is_empty());
    }

    #[tokio::test]
    async fn test_denied_access_collapses_to_empty() {
        let mut store = MemoryStore::new();
        let t = offset();
        store.insert_sample(
            MetricKind::Steps,
            t.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            4200.0,
            Unit::Count,
        );
        store.deny(MetricKind::Steps);

        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);
        assert!(agg.day_samples(MetricKind::Steps, day()).await.is_empty());
    }

    #[tokio::test]
    async fn test_day_batch_scopes_to_the_day() {
        let mut store = MemoryStore::new();
        let t = offset();
        store.insert_sample(
            MetricKind::HeartRate,
            t.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            62.0,
            Unit::BeatsPerMinute,
        );
        store.insert_sample(
            MetricKind::HeartRate,
            t.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap(),
            64.0,
            Unit::BeatsPerMinute,
        );

        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);
        let batch = agg.day_batch(MetricKind::HeartRate, day()).await.unwrap();
        assert_eq!(batch.day, day());
        assert_eq!(batch.readings.len(), 1);
    }

    #[tokio::test]
    async fn test_night_intervals_use_fetch_window() {
        let mut store = MemoryStore::new();
        let t = offset();
        // In window: previous evening
        store.insert_sleep(
            t.with_ymd_and_hms(2024, 3, 3, 23, 10, 0).unwrap(),
            t.with_ymd_and_hms(2024, 3, 3, 23, 55, 0).unwrap(),
            SleepStage::Core,
        );
        // Out of window: previous afternoon nap
        store.insert_sleep(
            t.with_ymd_and_hms(2024, 3, 3, 14, 0, 0).unwrap(),
            t.with_ymd_and_hms(2024, 3, 3, 15, 0, 0).unwrap(),
            SleepStage::Core,
        );

        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);
        let intervals = agg.night_intervals(day()).await;
        assert_eq!(intervals.len(), 1);
    }

    #[tokio::test]
    async fn test_lookback_window_length() {
        let mut store = MemoryStore::new();
        let t = offset();
        store.insert_sample(
            MetricKind::HeartRate,
            t.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            60.0,
            Unit::BeatsPerMinute,
        );
        store.insert_sample(
            MetricKind::HeartRate,
            t.with_ymd_and_hms(2024, 2, 20, 8, 0, 0).unwrap(),
            58.0,
            Unit::BeatsPerMinute,
        );

        let agg = Aggregator::new(Arc::new(store), chrono_tz::UTC);
        let reference = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let samples = agg
            .lookback_samples(MetricKind::HeartRate, 7, reference)
            .await;
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 60.0);
    }
}
