//! Health data store access for the sync agent.
//!
//! The device-local health store is an external collaborator; this module
//! defines the query seam the aggregator reads through, plus an in-memory
//! implementation backed by exported sample files.

pub mod memory;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

// Re-export commonly used types
pub use memory::MemoryStore;
pub use types::{
    MetricKind, QuantitySample, RawSample, SleepInterval, SleepStage, StoreError, Unit,
};

/// Query interface over the device-local health data store.
///
/// Both queries return samples ordered by ascending start time, restricted
/// to `[start, end)`. Authorization is all-or-nothing per metric kind; a
/// store reports denied access as [`StoreError::NotAuthorized`].
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Fetch quantity samples of one metric kind within a time range.
    async fn quantity_samples(
        &self,
        kind: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QuantitySample>, StoreError>;

    /// Fetch raw sleep-stage intervals whose start falls within a time range.
    async fn sleep_intervals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepInterval>, StoreError>;
}
