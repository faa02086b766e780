//! Configuration management for the stock screener.
//!
//! The service reads a single JSON file at `~/.stock-screener/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ALPHA_VANTAGE_API_KEY` → secrets.alpha_vantage_api_key
//! - `SCREENER_PORT` (or `PORT`) → server.port
//! - `SCREENER_BIND_ADDRESS` → server.host
//! - `SCREENER_LOG_LEVEL` → observability.log_level
//! - `SCREENER_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".stock-screener"),
        |dirs| dirs.home_dir().join(".stock-screener"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Credentials for upstream services
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Market data provider settings (call budget, timeouts)
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Screening pipeline settings
    #[serde(default)]
    pub screener: ScreenerConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("ALPHA_VANTAGE_API_KEY") {
            if !key.trim().is_empty() {
                self.secrets.alpha_vantage_api_key = Some(key);
            }
        }

        // SCREENER_PORT wins over the generic PORT
        for var in ["PORT", "SCREENER_PORT"] {
            if let Ok(port) = std::env::var(var) {
                if let Ok(p) = port.parse() {
                    self.server.port = p;
                }
            }
        }

        if let Ok(bind) = std::env::var("SCREENER_BIND_ADDRESS") {
            self.server.host = bind;
        }

        if let Ok(level) = std::env::var("SCREENER_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(format) = std::env::var("SCREENER_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Alpha Vantage API key, if configured.
    pub fn alpha_vantage_api_key(&self) -> Option<&str> {
        self.secrets
            .alpha_vantage_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============================================================================
// Server
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to pin at `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Secrets
// ============================================================================

/// Upstream credentials.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// Alpha Vantage API key
    #[serde(default)]
    pub alpha_vantage_api_key: Option<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field(
                "alpha_vantage_api_key",
                &self.alpha_vantage_api_key.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Market data provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Alpha Vantage query endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// External call budget (requests per minute). Free tier allows 5.
    #[serde(default = "default_calls_per_minute")]
    pub calls_per_minute: u32,

    /// Explicit delay between consecutive calls of one request.
    /// Derived from `calls_per_minute` when unset.
    #[serde(default)]
    pub call_delay_ms: Option<u64>,

    /// Per-call timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            calls_per_minute: default_calls_per_minute(),
            call_delay_ms: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Delay enforced between consecutive external calls of one request.
    ///
    /// Without an explicit value this is one budget interval plus one second
    /// of headroom (13s for 5 calls/minute).
    pub fn call_delay(&self) -> Duration {
        match self.call_delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => {
                let interval_ms = 60_000 / u64::from(self.calls_per_minute.max(1));
                Duration::from_millis(interval_ms + 1_000)
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum entries per cache before eviction kicks in
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// Interval of the background sweep of expired entries
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ============================================================================
// Screener
// ============================================================================

/// How the moving averages treat a history shorter than their window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverageMode {
    /// Always divide by the window length (50), even with fewer samples.
    /// Skews short histories low; kept for compatibility with existing clients.
    #[default]
    FixedWindow,
    /// Divide by the number of samples actually averaged.
    AvailableSamples,
}

/// Screening pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Maximum symbols screened per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Moving-average divisor policy
    #[serde(default)]
    pub moving_average_mode: MovingAverageMode,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            moving_average_mode: MovingAverageMode::default(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}
fn default_base_url() -> String {
    "https://www.alphavantage.co/query".into()
}
fn default_calls_per_minute() -> u32 {
    5
}
fn default_request_timeout() -> u64 {
    30
}
fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}
fn default_cache_max_entries() -> usize {
    1024
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_batch_size() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.provider.calls_per_minute, 5);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.screener.batch_size, 3);
        assert_eq!(
            config.screener.moving_average_mode,
            MovingAverageMode::FixedWindow
        );
        assert!(config.alpha_vantage_api_key().is_none());
    }

    #[test]
    fn test_call_delay_derived_from_budget() {
        let provider = ProviderConfig::default();
        assert_eq!(provider.call_delay(), Duration::from_secs(13));

        let provider = ProviderConfig {
            calls_per_minute: 60,
            ..Default::default()
        };
        assert_eq!(provider.call_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_call_delay_explicit() {
        let provider = ProviderConfig {
            call_delay_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(provider.call_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "server": {{ "port": 8080 }},
                "screener": {{ "moving_average_mode": "available_samples" }},
                "secrets": {{ "alpha_vantage_api_key": "demo" }}
            }}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.screener.batch_size, 3);
        assert_eq!(
            config.screener.moving_average_mode,
            MovingAverageMode::AvailableSamples
        );
        assert_eq!(config.alpha_vantage_api_key(), Some("demo"));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_secrets_debug_redacted() {
        let secrets = SecretsConfig {
            alpha_vantage_api_key: Some("super-secret".into()),
        };
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
