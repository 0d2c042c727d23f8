//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Currency pairs sharing the exchange's request quota
    #[serde(default = "defaults::pairs")]
    pub pairs: Vec<String>,

    /// Ticker endpoint and HTTP client settings
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Polling interval and backoff settings
    #[serde(default)]
    pub pulse: PulseConfig,

    /// Sample storage locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            return Err(AppError::validation("No currency pairs defined"));
        }
        if self.endpoint.user_agent.trim().is_empty() {
            return Err(AppError::validation("endpoint.user_agent is empty"));
        }
        if self.endpoint.timeout_secs == 0 {
            return Err(AppError::validation("endpoint.timeout_secs must be > 0"));
        }
        if self.pulse.per_minute_quota == 0 {
            return Err(AppError::validation("pulse.per_minute_quota must be > 0"));
        }
        if self.pulse.backoff_factor.is_nan() || self.pulse.backoff_factor < 1.0 {
            return Err(AppError::validation("pulse.backoff_factor must be >= 1.0"));
        }
        if self.pulse.min_interval_ms == 0 {
            return Err(AppError::validation("pulse.min_interval_ms must be > 0"));
        }
        if self.pulse.min_interval_ms > self.pulse.max_interval_ms {
            return Err(AppError::validation(
                "pulse.min_interval_ms must not exceed pulse.max_interval_ms",
            ));
        }
        Ok(())
    }

    /// Directory holding data for all pairs.
    ///
    /// The test environment keeps its data apart from the live one.
    pub fn data_root(&self, storage_dir: &Path, test: bool) -> PathBuf {
        self.env_root(storage_dir, test).join(&self.storage.data_dir)
    }

    /// Directory holding log files.
    pub fn log_root(&self, storage_dir: &Path, test: bool) -> PathBuf {
        self.env_root(storage_dir, test).join(&self.logging.dir)
    }

    fn env_root(&self, storage_dir: &Path, test: bool) -> PathBuf {
        if test {
            storage_dir.join(&self.storage.test_dir)
        } else {
            storage_dir.to_path_buf()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pairs: defaults::pairs(),
            endpoint: EndpointConfig::default(),
            pulse: PulseConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Ticker endpoint and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Scheme and host of the exchange API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path of the ticker resource
    #[serde(default = "defaults::ticker_path")]
    pub ticker_path: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            ticker_path: defaults::ticker_path(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Polling interval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Requests per minute the exchange allows across all pairs
    #[serde(default = "defaults::per_minute_quota")]
    pub per_minute_quota: u32,

    /// Multiplier applied to the interval on a throttling response
    #[serde(default = "defaults::backoff_factor")]
    pub backoff_factor: f64,

    /// Lower bound for the polling interval in milliseconds
    #[serde(default = "defaults::min_interval")]
    pub min_interval_ms: u64,

    /// Upper bound for the polling interval in milliseconds
    #[serde(default = "defaults::max_interval")]
    pub max_interval_ms: u64,
}

impl PulseConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            per_minute_quota: defaults::per_minute_quota(),
            backoff_factor: defaults::backoff_factor(),
            min_interval_ms: defaults::min_interval(),
            max_interval_ms: defaults::max_interval(),
        }
    }
}

/// Sample storage locations, relative to the storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Root used instead of the storage directory in test mode
    #[serde(default = "defaults::test_dir")]
    pub test_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            test_dir: defaults::test_dir(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn or error
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Log directory, relative to the storage directory
    #[serde(default = "defaults::log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            dir: defaults::log_dir(),
        }
    }
}

mod defaults {
    pub fn pairs() -> Vec<String> {
        vec![
            "btc_krw".into(),
            "etc_krw".into(),
            "eth_krw".into(),
            "xrp_krw".into(),
        ]
    }

    // Endpoint defaults
    pub fn base_url() -> String {
        "https://api.korbit.co.kr".into()
    }
    pub fn ticker_path() -> String {
        "/v1/ticker/detailed".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; ticker-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }

    // Pulse defaults
    pub fn per_minute_quota() -> u32 {
        60
    }
    pub fn backoff_factor() -> f64 {
        2.0
    }
    pub fn min_interval() -> u64 {
        500
    }
    pub fn max_interval() -> u64 {
        60_000
    }

    // Storage defaults
    pub fn data_dir() -> String {
        "data".into()
    }
    pub fn test_dir() -> String {
        "korbit_sphere".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn log_dir() -> String {
        "log".into()
    }
}
