//! Upload client for syncing metric batches to the account backend.
//!
//! Each batch goes out as one `POST /healthdata/save` with a
//! `{ userId, metricType, data }` body. Timestamps keep the local offset
//! they were captured with; the backend expects them that way.

use crate::aggregate::{DailySleepRecord, MetricBatch};
use serde::Serialize;

/// Backend sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backend base URL (no trailing slash)
    pub base_url: String,
    /// Bearer authentication token
    pub token: Option<String>,
    /// Account identifier batches are tagged with
    pub user_id: Option<String>,
}

impl SyncConfig {
    /// Create a new sync configuration.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            user_id,
        }
    }

    /// Get the health data save endpoint URL.
    pub fn save_url(&self) -> String {
        format!("{}/healthdata/save", self.base_url.trim_end_matches('/'))
    }

    /// Both credentials are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
            && self.user_id.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Upload client error types.
#[derive(Debug)]
pub enum SyncError {
    /// Configuration error (missing credentials, bad URL)
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Config(msg) => write!(f, "sync config error: {msg}"),
            SyncError::Network(msg) => write!(f, "sync network error: {msg}"),
            SyncError::Server { status, message } => {
                write!(f, "sync server error ({status}): {message}")
            }
            SyncError::Serialization(msg) => write!(f, "sync serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

/// One timestamped reading on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    /// ISO-8601 with the capture-time local offset
    pub timestamp: String,
    pub value: f64,
}

/// One day's readings on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct DaySeries {
    /// Local calendar day, `YYYY-MM-DD`
    pub date: String,
    pub values: Vec<Reading>,
}

/// Upload body for a quantity metric batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityUpload {
    pub user_id: String,
    pub metric_type: String,
    pub data: Vec<DaySeries>,
}

/// One night's sleep record on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepDay {
    /// Local calendar day, `YYYY-MM-DD`
    pub date: String,
    pub sleep_start: String,
    pub wake_up: String,
}

/// Upload body for sleep records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepUpload {
    pub user_id: String,
    pub metric_type: String,
    pub data: Vec<SleepDay>,
}

/// Client for pushing metric batches to the backend.
pub struct SyncClient {
    config: SyncConfig,
    client: reqwest::Client,
    run_id: String,
}

impl SyncClient {
    /// Create a new sync client.
    pub fn new(config: SyncConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        let run_id = format!("sync-{}", &uuid::Uuid::new_v4().to_string()[..8]);

        Self {
            config,
            client,
            run_id,
        }
    }

    /// Identifier for this sync run, used in logs.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Whether the client has credentials to upload with.
    pub fn has_credentials(&self) -> bool {
        self.config.has_credentials()
    }

    /// Upload one quantity metric batch.
    pub async fn upload_quantity(&self, batch: &MetricBatch) -> Result<(), SyncError> {
        let user_id = self.require_user_id()?;
        let body = QuantityUpload {
            user_id: user_id.to_string(),
            metric_type: batch.kind.wire_name().to_string(),
            data: vec![DaySeries {
                date: batch.day.format("%Y-%m-%d").to_string(),
                values: batch
                    .readings
                    .iter()
                    .map(|r| Reading {
                        timestamp: r.timestamp.to_rfc3339(),
                        value: r.value,
                    })
                    .collect(),
            }],
        };
        self.post(&body).await
    }

    /// Upload one night's sleep record.
    pub async fn upload_sleep(&self, record: &DailySleepRecord) -> Result<(), SyncError> {
        let user_id = self.require_user_id()?;
        let body = SleepUpload {
            user_id: user_id.to_string(),
            metric_type: "sleepData".to_string(),
            data: vec![SleepDay {
                date: record.date.format("%Y-%m-%d").to_string(),
                sleep_start: record.sleep_start.to_rfc3339(),
                wake_up: record.wake_up.to_rfc3339(),
            }],
        };
        self.post(&body).await
    }

    fn require_user_id(&self) -> Result<&str, SyncError> {
        self.config
            .user_id
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SyncError::Config("no userId configured".to_string()))
    }

    fn require_token(&self) -> Result<&str, SyncError> {
        self.config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Config("no auth token configured".to_string()))
    }

    async fn post<T: Serialize>(&self, body: &T) -> Result<(), SyncError> {
        let token = self.require_token()?;

        let response = self
            .client
            .post(self.config.save_url())
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SyncError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
