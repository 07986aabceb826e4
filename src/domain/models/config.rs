//! Runtime configuration model.

use serde::{Deserialize, Serialize};

/// Top-level configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub review: ReviewServiceConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// SQLite connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL or file path.
    pub path: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "sqlite:casewatch.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 3,
        }
    }
}

/// Remote review service endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewServiceConfig {
    /// Base URL of the review API.
    pub endpoint: String,
    /// API key, sent as basic-auth username.
    pub api_key: String,
    /// Per-request timeout. Keeps one stuck remote call from
    /// stalling the whole tick.
    pub timeout_secs: u64,
}

impl Default for ReviewServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.review.example.com/v2".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Knobs for the retry scheduler and its surrounding daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Retry count at which an async-wait case is promoted even
    /// without verification signals.
    pub promotion_threshold: u32,
    /// Bounded wait for the per-case exclusive lock.
    pub lock_timeout_ms: u64,
    /// Lease age after which an abandoned lock may be reclaimed.
    pub lock_ttl_secs: u64,
    /// Interval between reconciliation ticks.
    pub tick_interval_secs: u64,
    /// Whether the daemon runs a tick immediately on startup.
    pub run_on_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: 5,
            lock_timeout_ms: 3_000,
            lock_ttl_secs: 300,
            tick_interval_secs: 300,
            run_on_startup: true,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset: trace, debug, info, warn, error.
    pub level: String,
    /// Output format: json or pretty.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
