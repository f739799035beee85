//! Configuration for the health sync agent.

use crate::store::MetricKind;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the sync agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL, no trailing slash
    pub base_url: String,

    /// Account identifier batches are tagged with
    pub user_id: Option<String>,

    /// Bearer authentication token
    pub token: Option<String>,

    /// IANA timezone used for day bucketing, e.g. "Europe/Helsinki"
    pub timezone: String,

    /// How many days back a default sync run reaches
    pub lookback_days: u32,

    /// Which metrics to sync
    pub metrics: MetricToggles,

    /// Path to a health store export file, when not passed on the CLI
    pub store_path: Option<PathBuf>,

    /// Path for storing state and sync stats
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("health-sync-agent");

        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            user_id: None,
            token: None,
            timezone: "UTC".to_string(),
            lookback_days: 7,
            metrics: MetricToggles::default(),
            store_path: None,
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("health-sync-agent")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Parse the configured timezone, falling back to UTC on bad input.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }
}

/// Which metrics the agent syncs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricToggles {
    pub steps: bool,
    pub heart_rate: bool,
    pub resting_heart_rate: bool,
    pub hrv: bool,
    pub wrist_temperature: bool,
    pub exercise_minutes: bool,
    pub sleep: bool,
}

impl Default for MetricToggles {
    fn default() -> Self {
        Self {
            steps: true,
            heart_rate: true,
            resting_heart_rate: true,
            hrv: true,
            wrist_temperature: true,
            exercise_minutes: true,
            sleep: true,
        }
    }
}

impl MetricToggles {
    /// Parse metric toggles from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let names: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        let has = |name: &str| names.iter().any(|n| n == name || n == "all");

        Self {
            steps: has("steps"),
            heart_rate: has("heartrate"),
            resting_heart_rate: has("restingheartrate"),
            hrv: has("hrv"),
            wrist_temperature: has("wristtemperature"),
            exercise_minutes: has("exerciseminutes"),
            sleep: has("sleep"),
        }
    }

    /// Check if at least one metric is enabled.
    pub fn any_enabled(&self) -> bool {
        self.steps
            || self.heart_rate
            || self.resting_heart_rate
            || self.hrv
            || self.wrist_temperature
            || self.exercise_minutes
            || self.sleep
    }

    /// The enabled metrics in canonical order.
    pub fn to_kinds(&self) -> Vec<MetricKind> {
        let mut kinds = Vec::new();
        if self.steps {
            kinds.push(MetricKind::Steps);
        }
        if self.heart_rate {
            kinds.push(MetricKind::HeartRate);
        }
        if self.resting_heart_rate {
            kinds.push(MetricKind::RestingHeartRate);
        }
        if self.hrv {
            kinds.push(MetricKind::HeartRateVariability);
        }
        if self.wrist_temperature {
            kinds.push(MetricKind::WristTemperature);
        }
        if self.exercise_minutes {
            kinds.push(MetricKind::ExerciseMinutes);
        }
        if self.sleep {
            kinds.push(MetricKind::Sleep);
        }
        kinds
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
