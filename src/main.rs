//! Health Sync Agent CLI
//!
//! Reads a health store export, buckets samples into local days, and
//! syncs them to the account backend.

use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use health_sync_agent::{
    aggregate::{fetch_window, reconstruct_night},
    config::{Config, MetricToggles},
    stats::create_shared_stats_with_persistence,
    Aggregator, HealthStore, MemoryStore, SyncClient, SyncConfig, SyncDriver, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "health-sync")]
#[command(version = VERSION)]
#[command(about = "Day-bucketed health metric sync client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync recent days to the backend
    Sync {
        /// How many days back to sync
        #[arg(long)]
        days: Option<u32>,

        /// Health store export file to read
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Account identifier (overrides config)
        #[arg(long)]
        user_id: Option<String>,

        /// Auth token (overrides config)
        #[arg(long)]
        token: Option<String>,

        /// Backend base URL (overrides config)
        #[arg(long)]
        base_url: Option<String>,

        /// Day-bucketing timezone (overrides config)
        #[arg(long)]
        timezone: Option<String>,

        /// Metrics to sync (comma-separated, or "all")
        #[arg(long, default_value = "all")]
        metrics: String,
    },

    /// Reconstruct one night's sleep record without uploading
    Sleep {
        /// The calendar day to reconstruct, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,

        /// Health store export file to read
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Day-bucketing timezone (overrides config)
        #[arg(long)]
        timezone: Option<String>,
    },

    /// Show configuration and cumulative sync statistics
    Status,

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            days,
            input,
            user_id,
            token,
            base_url,
            timezone,
            metrics,
        } => {
            cmd_sync(days, input, user_id, token, base_url, timezone, &metrics).await;
        }
        Commands::Sleep {
            date,
            input,
            timezone,
        } => {
            cmd_sleep(date, input, timezone).await;
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

async fn cmd_sync(
    days: Option<u32>,
    input: Option<PathBuf>,
    user_id: Option<String>,
    token: Option<String>,
    base_url: Option<String>,
    timezone: Option<String>,
    metrics: &str,
) {
    println!("Health Sync Agent v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let toggles = MetricToggles::from_csv(metrics);
    if !toggles.any_enabled() {
        eprintln!("Error: At least one metric must be enabled");
        std::process::exit(1);
    }

    let tz = resolve_timezone(timezone.as_deref(), &config);
    let store = load_store(input.or_else(|| config.store_path.clone()));

    let base = base_url.unwrap_or_else(|| config.base_url.clone());
    let sync_config = SyncConfig::new(
        base.clone(),
        token.or_else(|| config.token.clone()),
        user_id.or_else(|| config.user_id.clone()),
    );
    let client = SyncClient::new(sync_config);

    if !client.has_credentials() {
        eprintln!("Error: No credentials configured.");
        eprintln!();
        eprintln!("Set user_id and token in the config file or pass");
        eprintln!("--user-id and --token on the command line.");
        std::process::exit(1);
    }

    let lookback = days.unwrap_or(config.lookback_days);
    let end = Utc::now();
    let start = end - Duration::days(i64::from(lookback));

    println!("Syncing {lookback} day(s) to {base}");
    println!("  Timezone: {tz}");
    println!("  Metrics: {}", toggles.to_kinds().len());
    println!();

    let stats = create_shared_stats_with_persistence(config.data_path.join("sync_stats.json"));

    let aggregator = Aggregator::new(store, tz);
    let driver = SyncDriver::new(aggregator, client)
        .with_metrics(toggles.to_kinds())
        .with_stats(stats.clone());

    match driver.run(start, end).await {
        Ok(report) => {
            if let Err(e) = stats.save() {
                eprintln!("Warning: Could not save sync stats: {e}");
            }

            println!("{}", report.summary());
            if !report.success() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: Sync did not start: {e}");
            std::process::exit(1);
        }
    }
}

async fn cmd_sleep(date: NaiveDate, input: Option<PathBuf>, timezone: Option<String>) {
    let config = Config::load().unwrap_or_default();
    let tz = resolve_timezone(timezone.as_deref(), &config);
    let store = load_store(input.or_else(|| config.store_path.clone()));

    let (night_start, night_end) = fetch_window(date, tz);
    let intervals = match store.sleep_intervals(night_start, night_end).await {
        Ok(intervals) => intervals,
        Err(e) => {
            eprintln!("Error: Could not read sleep intervals: {e}");
            std::process::exit(1);
        }
    };

    match reconstruct_night(date, &intervals, tz) {
        Some(record) => {
            println!("Sleep record for {date}:");
            println!("  Sleep start: {}", record.sleep_start.to_rfc3339());
            println!("  Wake up:     {}", record.wake_up.to_rfc3339());
            let minutes = (record.wake_up - record.sleep_start).num_minutes();
            println!("  In bed:      {minutes} min");
        }
        None => {
            println!("No qualifying sleep record for {date}.");
            println!("({} interval(s) in the night window)", intervals.len());
        }
    }
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Health Sync Agent Status");
    println!("========================");
    println!();
    println!("Configuration:");
    println!("  Backend: {}", config.base_url);
    println!(
        "  User: {}",
        config.user_id.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Token: {}",
        if config.token.as_deref().is_some_and(|t| !t.is_empty()) {
            "set"
        } else {
            "(not set)"
        }
    );
    println!("  Timezone: {}", config.timezone);
    println!("  Lookback: {} day(s)", config.lookback_days);
    println!();

    // Load and show cumulative stats if available
    let stats_path = config.data_path.join("sync_stats.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(n) = stats.get("samples_read") {
                    println!("  Samples read: {n}");
                }
                if let Some(n) = stats.get("batches_uploaded") {
                    println!("  Batches uploaded: {n}");
                }
                if let Some(n) = stats.get("upload_failures") {
                    println!("  Upload failures: {n}");
                }
                if let Some(n) = stats.get("days_walked") {
                    println!("  Days walked: {n}");
                }
            }
        }
    } else {
        println!("No previous sync data found.");
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// CLI timezone wins over the config file; bad names fall back to UTC.
fn resolve_timezone(cli: Option<&str>, config: &Config) -> Tz {
    match cli {
        Some(name) => match name.parse() {
            Ok(tz) => tz,
            Err(_) => {
                eprintln!("Warning: Unknown timezone {name:?}, using UTC");
                Tz::UTC
            }
        },
        None => config.tz(),
    }
}

/// Open the health store export, or exit with a usable message.
fn load_store(path: Option<PathBuf>) -> Arc<MemoryStore> {
    let Some(path) = path else {
        eprintln!("Error: No health store export configured.");
        eprintln!();
        eprintln!("Pass --input <file> or set store_path in the config file.");
        std::process::exit(1);
    };

    match MemoryStore::from_json_file(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Error: Could not load health store from {path:?}: {e}");
            std::process::exit(1);
        }
    }
}
