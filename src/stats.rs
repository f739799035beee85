//! Cumulative sync statistics.
//!
//! Tracks how much data has been read and uploaded across sync runs,
//! without storing any of the readings themselves. Counters can be
//! persisted to disk so `status` reflects the whole history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sync statistics for the current session.
#[derive(Debug)]
pub struct SyncStatsLog {
    /// Number of samples read from the health store
    samples_read: AtomicU64,
    /// Number of metric batches uploaded
    batches_uploaded: AtomicU64,
    /// Number of batch uploads that failed
    upload_failures: AtomicU64,
    /// Number of days walked by the sync driver
    days_walked: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl SyncStatsLog {
    /// Create a new stats log.
    pub fn new() -> Self {
        Self {
            samples_read: AtomicU64::new(0),
            batches_uploaded: AtomicU64::new(0),
            upload_failures: AtomicU64::new(0),
            days_walked: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a stats log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        // Try to load existing stats
        if let Err(e) = log.load() {
            eprintln!("Note: Could not load previous sync stats: {e}");
        }

        log
    }

    /// Record samples read from the store.
    pub fn record_samples_read(&self, count: u64) {
        self.samples_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an uploaded batch.
    pub fn record_batch_uploaded(&self) {
        self.batches_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed batch upload.
    pub fn record_upload_failure(&self) {
        self.upload_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a day walked by the driver.
    pub fn record_day_walked(&self) {
        self.days_walked.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            samples_read: self.samples_read.load(Ordering::Relaxed),
            batches_uploaded: self.batches_uploaded.load(Ordering::Relaxed),
            upload_failures: self.upload_failures.load(Ordering::Relaxed),
            days_walked: self.days_walked.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds() as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Sync Statistics:\n\
             - Samples read: {}\n\
             - Batches uploaded: {}\n\
             - Upload failures: {}\n\
             - Days walked: {}\n\
             - Session duration: {} seconds",
            stats.samples_read,
            stats.batches_uploaded,
            stats.upload_failures,
            stats.days_walked,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                samples_read: stats.samples_read,
                batches_uploaded: stats.batches_uploaded,
                upload_failures: stats.upload_failures,
                days_walked: stats.days_walked,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_read
                    .store(persisted.samples_read, Ordering::Relaxed);
                self.batches_uploaded
                    .store(persisted.batches_uploaded, Ordering::Relaxed);
                self.upload_failures
                    .store(persisted.upload_failures, Ordering::Relaxed);
                self.days_walked
                    .store(persisted.days_walked, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.samples_read.store(0, Ordering::Relaxed);
        self.batches_uploaded.store(0, Ordering::Relaxed);
        self.upload_failures.store(0, Ordering::Relaxed);
        self.days_walked.store(0, Ordering::Relaxed);
    }
}

impl Default for SyncStatsLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of sync statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStats {
    pub samples_read: u64,
    pub batches_uploaded: u64,
    pub upload_failures: u64,
    pub days_walked: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_read: u64,
    batches_uploaded: u64,
    upload_failures: u64,
    days_walked: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared stats log.
pub type SharedSyncStats = Arc<SyncStatsLog>;

/// Create a new shared stats log.
pub fn create_shared_stats() -> SharedSyncStats {
    Arc::new(SyncStatsLog::new())
}

/// Create a new shared stats log with persistence.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedSyncStats {
    Arc::new(SyncStatsLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counting() {
        let log = SyncStatsLog::new();

        log.record_samples_read(12);
        log.record_batch_uploaded();
        log.record_batch_uploaded();
        log.record_upload_failure();
        log.record_day_walked();

        let stats = log.stats();
        assert_eq!(stats.samples_read, 12);
        assert_eq!(stats.batches_uploaded, 2);
        assert_eq!(stats.upload_failures, 1);
        assert_eq!(stats.days_walked, 1);
    }

    #[test]
    fn test_stats_reset() {
        let log = SyncStatsLog::new();

        log.record_samples_read(100);
        log.record_day_walked();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.samples_read, 0);
        assert_eq!(stats.days_walked, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let log = SyncStatsLog::with_persistence(path.clone());
        log.record_samples_read(7);
        log.record_batch_uploaded();
        log.save().unwrap();

        let reloaded = SyncStatsLog::with_persistence(path);
        let stats = reloaded.stats();
        assert_eq!(stats.samples_read, 7);
        assert_eq!(stats.batches_uploaded, 1);
    }

    #[test]
    fn test_summary_format() {
        let log = SyncStatsLog::new();
        let summary = log.summary();

        assert!(summary.contains("Samples read"));
        assert!(summary.contains("Batches uploaded"));
        assert!(summary.contains("Upload failures"));
    }
}
