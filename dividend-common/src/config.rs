//! Configuration management for the dividend calculator.
//!
//! The service reads a single configuration file at
//! `~/.dividend-calculator/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `DIVCALC_HOST` → server.host
//! - `DIVCALC_PORT` → server.port
//! - `DIVCALC_LOG_LEVEL` → observability.log_level
//! - `DIVCALC_LOG_FORMAT` → observability.log_format
//! - `DIVCALC_SCRAPER` → screener.scraper_executable
//! - `DIVCALC_UNIVERSE` → screener.universe_path
//! - `CACHE_PATH` → cache.dir (same variable the scraper reads)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::logging::LogFormat;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".dividend-calculator"),
        |dirs| dirs.home_dir().join(".dividend-calculator"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// On-disk response cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote finance data provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Bulk collection and filtering
    #[serde(default)]
    pub screener: ScreenerConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
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

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DIVCALC_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DIVCALC_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid DIVCALC_PORT"),
            }
        }
        if let Some(level) = lookup("DIVCALC_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("DIVCALC_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(scraper) = lookup("DIVCALC_SCRAPER") {
            self.screener.scraper_executable = PathBuf::from(scraper);
        }
        if let Some(universe) = lookup("DIVCALC_UNIVERSE") {
            self.screener.universe_path = Some(PathBuf::from(universe));
        }
        if let Some(dir) = lookup("CACHE_PATH") {
            self.cache.dir = PathBuf::from(dir);
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.port == 0 {
            return Err(Error::invalid("server.port", "must be non-zero"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(Error::invalid("cache.ttl_secs", "must be non-zero"));
        }
        if self.provider.timeout_secs == 0 {
            return Err(Error::invalid("provider.timeout_secs", "must be non-zero"));
        }
        self.observability.log_format.parse::<LogFormat>()?;
        Ok(())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server configuration.
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

/// Disk cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding `<prefix>_<args>.json` files
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Freshness window measured from file modification time
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Remote finance provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Host serving the quote-summary and price chart endpoints
    #[serde(default = "default_quote_base_url")]
    pub quote_base_url: String,

    /// Host serving the dividend chart and search endpoints
    #[serde(default = "default_chart_base_url")]
    pub chart_base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            quote_base_url: default_quote_base_url(),
            chart_base_url: default_chart_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Screener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// External bulk scraper invoked as `<executable> <symbol>...`
    #[serde(default = "default_scraper_executable")]
    pub scraper_executable: PathBuf,

    /// JSON file with the index constituent lists. Unset uses the bundled lists.
    #[serde(default)]
    pub universe_path: Option<PathBuf>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            scraper_executable: default_scraper_executable(),
            universe_path: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8085
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}
fn default_ttl_secs() -> u64 {
    60 * 60 * 24
}
fn default_quote_base_url() -> String {
    "https://query2.finance.yahoo.com".into()
}
fn default_chart_base_url() -> String {
    "https://query1.finance.yahoo.com".into()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64)".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_scraper_executable() -> PathBuf {
    PathBuf::from("./scraper")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}
