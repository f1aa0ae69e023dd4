//! Daemon configuration
//!
//! Loaded from a TOML file (`OTE_CONFIG_PATH`, default `ote_intraday.toml`)
//! with built-in defaults for anything missing, then overridden by
//! individual environment variables.

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::scheduler::{RetryPolicy, SchedulerConfig};
use crate::scrapers::ote::{OteSourceConfig, OTE_BASE_URL, OTE_INTRADAY_PAGE};

pub const DEFAULT_CONFIG_PATH: &str = "ote_intraday.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub source: SourceSettings,

    #[serde(default)]
    pub refresh: RefreshSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Where the intraday report comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default = "default_page_url")]
    pub page_url: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_page_url() -> String {
    OTE_INTRADAY_PAGE.to_string()
}

fn default_base_url() -> String {
    OTE_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// IANA zone the trading intervals are published in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Bound on one whole fetch (page + report download + parse)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_timezone() -> String {
    "Europe/Prague".to_string()
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load from `OTE_CONFIG_PATH` (or the default path), then apply env overrides.
    pub fn from_env() -> Self {
        let path =
            std::env::var("OTE_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default config ({}): {:#}", path, e);
            Self::default()
        });
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies `BIND_ADDR`, `OTE_PAGE_URL`, `OTE_TIMEZONE`, `OTE_MAX_RETRIES`,
    /// `OTE_RETRY_DELAY_SECS` and `OTE_FETCH_TIMEOUT_SECS`. Unparseable
    /// numbers are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("OTE_PAGE_URL") {
            self.source.page_url = v;
        }
        if let Some(v) = lookup("OTE_TIMEZONE") {
            self.refresh.timezone = v;
        }
        if let Some(n) = lookup("OTE_MAX_RETRIES").and_then(|v| v.trim().parse().ok()) {
            self.refresh.max_retries = n;
        }
        if let Some(n) = lookup("OTE_RETRY_DELAY_SECS").and_then(|v| v.trim().parse().ok()) {
            self.refresh.retry_delay_secs = n;
        }
        if let Some(n) = lookup("OTE_FETCH_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.refresh.fetch_timeout_secs = n;
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.refresh
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid timezone {:?}: {}", self.refresh.timezone, e))
    }

    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        Ok(SchedulerConfig {
            retry: RetryPolicy::new(
                self.refresh.max_retries,
                Duration::from_secs(self.refresh.retry_delay_secs),
            ),
            fetch_timeout: Duration::from_secs(self.refresh.fetch_timeout_secs),
            timezone: self.timezone()?,
        })
    }

    pub fn source_config(&self) -> OteSourceConfig {
        OteSourceConfig {
            page_url: self.source.page_url.clone(),
            base_url: self.source.base_url.clone(),
            timeout: Duration::from_secs(self.source.request_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.refresh.max_retries, 10);
        assert_eq!(config.refresh.retry_delay_secs, 60);
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Prague);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [refresh]
            max_retries = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.refresh.max_retries, 3);
        assert_eq!(config.refresh.retry_delay_secs, 60);
        assert_eq!(config.source.page_url, OTE_INTRADAY_PAGE);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("OTE_MAX_RETRIES", "4"),
            ("OTE_RETRY_DELAY_SECS", "not-a-number"),
            ("OTE_TIMEZONE", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.refresh.max_retries, 4);
        assert_eq!(config.refresh.retry_delay_secs, 60);
        assert_eq!(config.refresh.timezone, "Europe/Prague");
    }

    #[test]
    fn test_invalid_timezone() {
        let mut config = AppConfig::default();
        config.refresh.timezone = "Mars/Olympus".to_string();
        assert!(config.scheduler_config().is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(AppConfig::load("/nonexistent/ote_intraday.toml").is_err());
    }
}
