//! Health Sync Agent - day-bucketed health metric sync client.
//!
//! This library reads quantity samples and sleep intervals from a
//! pluggable health store, buckets them into local calendar days,
//! reconstructs nightly sleep sessions, and uploads the result to an
//! account backend one day at a time.
//!
//! # Sync model
//!
//! - **Days are walked serially**, oldest first, so the backend sees a
//!   consistent per-day history.
//! - **Within a day uploads run concurrently**, one request per metric.
//! - **A failed upload never stops the run**; it is logged and counted,
//!   and the final report says whether the run was complete.
//! - **Timestamps keep their capture-time local offset** on the wire.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Health Sync Agent                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ HealthStore │──▶│ Aggregator  │──▶│ SyncDriver  │       │
//! │  │  (trait)    │   │ (day/night) │   │ (day walk)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                          │                  │               │
//! │                          ▼                  ▼               │
//! │                   ┌─────────────┐   ┌─────────────┐        │
//! │                   │ Sleep merge │   │ SyncClient  │        │
//! │                   │ (sessions)  │   │ (backend)   │        │
//! │                   └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use health_sync_agent::{
//!     Aggregator, MemoryStore, SyncClient, SyncConfig, SyncDriver,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let store = Arc::new(MemoryStore::from_json_file("export.json").unwrap());
//! let aggregator = Aggregator::new(store, chrono_tz::UTC);
//! let client = SyncClient::new(SyncConfig::new(
//!     "http://127.0.0.1:3000",
//!     Some("token".into()),
//!     Some("user-1".into()),
//! ));
//!
//! let driver = SyncDriver::new(aggregator, client);
//! let end = chrono::Utc::now();
//! let start = end - chrono::Duration::days(7);
//! let report = driver.run(start, end).await.unwrap();
//! println!("{}", report.summary());
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod stats;
pub mod store;
pub mod upload;

// Re-export key types at crate root for convenience
pub use aggregate::{
    merge_sessions, reconstruct_night, Aggregator, DailySleepRecord, MetricBatch, SleepSession,
};
pub use config::{Config, ConfigError, MetricToggles};
pub use driver::{DayBatch, MetricCounters, SyncDriver, SyncReport};
pub use stats::{SharedSyncStats, SyncStats, SyncStatsLog};
pub use store::{
    HealthStore, MemoryStore, MetricKind, QuantitySample, RawSample, SleepInterval, SleepStage,
    StoreError, Unit,
};
pub use upload::{SyncClient, SyncConfig, SyncError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
