//! Sample types for the device-local health data store.
//!
//! The store hands back timestamped samples in whatever unit it recorded
//! them in; the aggregator normalizes to one canonical unit per metric kind.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The metric kinds tracked by the sync pipeline.
///
/// Serialized names are the backend's wire names (wrist temperature goes
/// out as `bodyTemperatureData` for compatibility with the existing API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "stepsData")]
    Steps,
    #[serde(rename = "heartRateData")]
    HeartRate,
    #[serde(rename = "restingHeartRateData")]
    RestingHeartRate,
    #[serde(rename = "hrvData")]
    HeartRateVariability,
    #[serde(rename = "bodyTemperatureData")]
    WristTemperature,
    #[serde(rename = "exerciseMinutesData")]
    ExerciseMinutes,
    #[serde(rename = "sleepData")]
    Sleep,
}

impl MetricKind {
    /// All tracked metric kinds, in upload order.
    pub const ALL: [MetricKind; 7] = [
        MetricKind::Steps,
        MetricKind::HeartRate,
        MetricKind::RestingHeartRate,
        MetricKind::HeartRateVariability,
        MetricKind::WristTemperature,
        MetricKind::ExerciseMinutes,
        MetricKind::Sleep,
    ];

    /// The quantity-sample kinds (everything except sleep, which is
    /// reconstructed from stage intervals instead of point readings).
    pub const QUANTITY: [MetricKind; 6] = [
        MetricKind::Steps,
        MetricKind::HeartRate,
        MetricKind::RestingHeartRate,
        MetricKind::HeartRateVariability,
        MetricKind::WristTemperature,
        MetricKind::ExerciseMinutes,
    ];

    /// Backend wire name for this metric kind.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MetricKind::Steps => "stepsData",
            MetricKind::HeartRate => "heartRateData",
            MetricKind::RestingHeartRate => "restingHeartRateData",
            MetricKind::HeartRateVariability => "hrvData",
            MetricKind::WristTemperature => "bodyTemperatureData",
            MetricKind::ExerciseMinutes => "exerciseMinutesData",
            MetricKind::Sleep => "sleepData",
        }
    }

    /// Canonical unit readings are normalized to before upload.
    ///
    /// `None` for sleep, which has no scalar unit.
    pub fn canonical_unit(&self) -> Option<Unit> {
        match self {
            MetricKind::Steps => Some(Unit::Count),
            MetricKind::HeartRate | MetricKind::RestingHeartRate => Some(Unit::BeatsPerMinute),
            MetricKind::HeartRateVariability => Some(Unit::Milliseconds),
            MetricKind::WristTemperature => Some(Unit::Celsius),
            MetricKind::ExerciseMinutes => Some(Unit::Minutes),
            MetricKind::Sleep => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Units a health store may report quantity samples in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "count/min")]
    BeatsPerMinute,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "degC")]
    Celsius,
    #[serde(rename = "degF")]
    Fahrenheit,
    #[serde(rename = "min")]
    Minutes,
}

impl Unit {
    /// Convert a value in this unit to the target unit.
    ///
    /// Returns `None` when no conversion between the two units exists.
    pub fn convert(self, value: f64, target: Unit) -> Option<f64> {
        if self == target {
            return Some(value);
        }
        match (self, target) {
            (Unit::Seconds, Unit::Milliseconds) => Some(value * 1000.0),
            (Unit::Milliseconds, Unit::Seconds) => Some(value / 1000.0),
            (Unit::Fahrenheit, Unit::Celsius) => Some((value - 32.0) * 5.0 / 9.0),
            (Unit::Celsius, Unit::Fahrenheit) => Some(value * 9.0 / 5.0 + 32.0),
            _ => None,
        }
    }
}

/// A quantity sample as reported by the health store, in its source unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantitySample {
    /// Capture time, with the local offset in effect at capture
    pub timestamp: DateTime<FixedOffset>,
    /// Numeric reading in `unit`
    pub value: f64,
    /// Unit the store recorded the reading in
    pub unit: Unit,
}

impl QuantitySample {
    pub fn new(timestamp: DateTime<FixedOffset>, value: f64, unit: Unit) -> Self {
        Self {
            timestamp,
            value,
            unit,
        }
    }
}

/// A unit-normalized sample produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Capture time, with the local offset in effect at capture
    pub timestamp: DateTime<FixedOffset>,
    /// Reading in the metric kind's canonical unit
    pub value: f64,
}

/// Sleep stage reported for one interval sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepStage {
    Core,
    Deep,
    Rem,
    Unspecified,
    Awake,
}

impl SleepStage {
    /// Whether this stage counts as being asleep when merging sessions.
    pub fn is_asleep(&self) -> bool {
        !matches!(self, SleepStage::Awake)
    }
}

/// A raw sleep-stage interval from the health store.
///
/// Invariant: `start < end`. Intervals violating it are dropped during
/// reconstruction rather than surfaced as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepInterval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub stage: SleepStage,
}

impl SleepInterval {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>, stage: SleepStage) -> Self {
        Self { start, end, stage }
    }

    /// Check the `start < end` invariant.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }
}

/// Errors a health store query can produce.
#[derive(Debug)]
pub enum StoreError {
    /// Read access for the metric kind was not granted
    NotAuthorized(MetricKind),
    /// The query itself failed
    Query(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotAuthorized(kind) => {
                write!(f, "read access not granted for {kind}")
            }
            StoreError::Query(msg) => write!(f, "store query failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
