//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` (path overridable via `TRADE_MONITOR_CONFIG`) and
//! deserializes into strongly-typed structs. Every field has a default, so a
//! deployment may run from environment variables alone. The tracked account
//! is referenced by env-var name and resolved at startup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::types::MonitorError;

/// Default config file path.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "TRADE_MONITOR_CONFIG";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub data_api: DataApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Literal account address. Takes precedence over `user_address_env`.
    #[serde(default)]
    pub user_address: Option<String>,
    /// Env var holding the account address.
    #[serde(default = "default_user_address_env")]
    pub user_address_env: String,
    /// Trades older than this many hours are never recorded.
    #[serde(default = "default_too_old_hours")]
    pub too_old_hours: f64,
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataApiConfig {
    #[serde(default = "default_data_api_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

fn default_user_address_env() -> String {
    "USER_ADDRESS".to_string()
}

fn default_too_old_hours() -> f64 {
    24.0
}

fn default_fetch_interval_secs() -> u64 {
    1
}

fn default_data_api_url() -> String {
    "https://data-api.polymarket.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_database_url() -> String {
    "sqlite://trade_monitor.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_dashboard_port() -> u16 {
    8080
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            user_address: None,
            user_address_env: default_user_address_env(),
            too_old_hours: default_too_old_hours(),
            fetch_interval_secs: default_fetch_interval_secs(),
        }
    }
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_data_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_dashboard_port(),
        }
    }
}

/// Validated settings consumed by the ingestion loop.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub account: String,
    pub too_old_hours: f64,
    pub fetch_interval: Duration,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply the env overrides `TOO_OLD_TIMESTAMP`, `FETCH_INTERVAL` and
    /// `DATABASE_URL`. `lookup` is `std::env::var(..).ok()` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TOO_OLD_TIMESTAMP") {
            self.monitor.too_old_hours = v
                .trim()
                .parse()
                .with_context(|| format!("TOO_OLD_TIMESTAMP is not a number: {v}"))?;
        }
        if let Some(v) = lookup("FETCH_INTERVAL") {
            self.monitor.fetch_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("FETCH_INTERVAL is not a whole number of seconds: {v}"))?;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.storage.database_url = v;
        }
        Ok(())
    }

    /// Resolve the account and validate the loop settings.
    pub fn monitor_settings<F>(&self, lookup: F) -> Result<MonitorSettings, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account = self
            .monitor
            .user_address
            .clone()
            .or_else(|| lookup(&self.monitor.user_address_env))
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| MonitorError::MissingAccount {
                source_hint: format!("monitor.user_address and ${}", self.monitor.user_address_env),
            })?;

        let hours = self.monitor.too_old_hours;
        if !hours.is_finite() || hours < 0.0 {
            return Err(MonitorError::Config(format!(
                "too_old_hours must be a non-negative number, got {hours}"
            )));
        }
        if self.monitor.fetch_interval_secs == 0 {
            return Err(MonitorError::Config(
                "fetch_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(MonitorSettings {
            account,
            too_old_hours: hours,
            fetch_interval: Duration::from_secs(self.monitor.fetch_interval_secs),
        })
    }
}
