//! In-memory health store implementation.
//!
//! This exists so the agent runs on platforms without a native health
//! store: samples are loaded from a JSON export file (or inserted
//! programmatically in tests) and queried by time range like the real
//! source would be.

use crate::store::types::{
    MetricKind, QuantitySample, SleepInterval, SleepStage, StoreError, Unit,
};
use crate::store::HealthStore;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A health store holding all samples in memory.
///
/// The serialized form matches the agent's export file format:
///
/// ```json
/// {
///   "samples": {
///     "heartRateData": [
///       { "timestamp": "2024-03-04T08:00:00+02:00", "value": 62.0, "unit": "count/min" }
///     ]
///   },
///   "sleep": [
///     { "start": "2024-03-03T23:10:00+02:00", "end": "2024-03-03T23:55:00+02:00", "stage": "core" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    /// Quantity samples keyed by metric kind (wire name in JSON)
    #[serde(default)]
    samples: BTreeMap<MetricKind, Vec<QuantitySample>>,
    /// Raw sleep-stage intervals
    #[serde(default)]
    sleep: Vec<SleepInterval>,
    /// Metric kinds the store refuses to serve (test hook for the
    /// authorization-denied path; never persisted)
    #[serde(skip)]
    denied: BTreeSet<MetricKind>,
    /// When set, every query fails (test hook for the query-error path)
    #[serde(skip)]
    fail_queries: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a store from its JSON export form.
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Query(format!("invalid store JSON: {e}")))
    }

    /// Load a store from a JSON export file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Query(format!("failed to read {path:?}: {e}")))?;
        Self::from_json_str(&content)
    }

    /// Add a quantity sample.
    pub fn insert_sample(&mut self, kind: MetricKind, timestamp: DateTime<FixedOffset>, value: f64, unit: Unit) {
        self.samples
            .entry(kind)
            .or_default()
            .push(QuantitySample::new(timestamp, value, unit));
    }

    /// Add a sleep-stage interval.
    pub fn insert_sleep(&mut self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>, stage: SleepStage) {
        self.sleep.push(SleepInterval::new(start, end, stage));
    }

    /// Refuse to serve a metric kind, as an unauthorized store would.
    pub fn deny(&mut self, kind: MetricKind) {
        self.denied.insert(kind);
    }

    /// Make every query fail.
    pub fn fail_queries(&mut self) {
        self.fail_queries = true;
    }

    /// Total number of quantity samples held.
    pub fn sample_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    /// Number of sleep intervals held.
    pub fn sleep_interval_count(&self) -> usize {
        self.sleep.len()
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    async fn quantity_samples(
        &self,
        kind: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuantitySample>, StoreError> {
        if self.fail_queries {
            return Err(StoreError::Query("store unavailable".to_string()));
        }
        if self.denied.contains(&kind) {
            return Err(StoreError::NotAuthorized(kind));
        }

        let mut result: Vec<QuantitySample> = self
            .samples
            .get(&kind)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.timestamp >= start && s.timestamp < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        result.sort_by_key(|s| s.timestamp);
        Ok(result)
    }

    async fn sleep_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, StoreError> {
        if self.fail_queries {
            return Err(StoreError::Query("store unavailable".to_string()));
        }
        if self.denied.contains(&MetricKind::Sleep) {
            return Err(StoreError::NotAuthorized(MetricKind::Sleep));
        }

        let mut result: Vec<SleepInterval> = self
            .sleep
            .iter()
            .filter(|i| i.start >= start && i.start < end)
            .cloned()
            .collect();
        result.sort_by_key(|i| i.start);
        Ok(result)
    }
}
