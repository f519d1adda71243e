use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::db::{Database, DbError};
use crate::feed::{FeedWindow, RetryPolicy, DEFAULT_FEED_BASE_URL};
use crate::geo::{Bounds, Region};
use crate::monitor::{BroadcasterSettings, DEFAULT_NOTIFY_THRESHOLD, DEFAULT_RETENTION_DAYS};

pub const MONITOR_CONFIG_SETTING_KEY: &str = "monitor_config";

const DB_FILE_NAME: &str = "quakewatch.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("settings storage error: {0}")]
    Db(#[from] DbError),
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,
    #[serde(default)]
    pub window: FeedWindow,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default)]
    pub region: Region,
    /// Explicit rectangle; takes precedence over `region`.
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default = "default_notify_threshold")]
    pub notify_threshold: f64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feed_base_url: default_feed_base_url(),
            window: FeedWindow::default(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            region: Region::default(),
            bounds: None,
            notify_threshold: default_notify_threshold(),
            retention_days: default_retention_days(),
            refresh_interval_secs: default_refresh_interval_secs(),
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are logged and
    /// ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = value("QUAKEWATCH_FEED_URL") {
            self.feed_base_url = url;
        }

        if let Some(raw) = value("QUAKEWATCH_REGION") {
            match Region::from_str(&raw) {
                Ok(region) => {
                    self.region = region;
                    self.bounds = None;
                }
                Err(error) => tracing::warn!("ignoring QUAKEWATCH_REGION: {error}"),
            }
        }

        if let Some(raw) = value("QUAKEWATCH_WINDOW") {
            match FeedWindow::from_str(&raw) {
                Ok(window) => self.window = window,
                Err(error) => tracing::warn!("ignoring QUAKEWATCH_WINDOW: {error}"),
            }
        }

        if let Some(raw) = value("QUAKEWATCH_NOTIFY_THRESHOLD") {
            match raw.parse::<f64>() {
                Ok(threshold) => self.notify_threshold = threshold,
                Err(error) => tracing::warn!("ignoring QUAKEWATCH_NOTIFY_THRESHOLD '{raw}': {error}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(self.feed_base_url.trim()).map_err(|error| {
            ConfigError::Invalid(format!(
                "invalid feed base url '{}': {error}",
                self.feed_base_url
            ))
        })?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max attempts must be greater than 0".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 || self.eviction_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "timer intervals must be greater than 0".to_string(),
            ));
        }
        if !self.notify_threshold.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "notify threshold must be a finite number, got {}",
                self.notify_threshold
            )));
        }
        if let Some(bounds) = self.bounds {
            if !bounds.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "bounds are inverted or not finite: {bounds:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn effective_bounds(&self) -> Bounds {
        self.bounds.unwrap_or_else(|| self.region.bounds())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn broadcaster_settings(&self) -> BroadcasterSettings {
        BroadcasterSettings {
            window: self.window,
            bounds: self.effective_bounds(),
            notify_threshold: self.notify_threshold,
            retention_days: self.retention_days,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }
}

pub fn load_monitor_config(db: &Database) -> Result<MonitorConfig, ConfigError> {
    let raw = queries::get_setting(db, MONITOR_CONFIG_SETTING_KEY)?;

    let mut config = if let Some(raw) = raw {
        serde_json::from_str::<MonitorConfig>(&raw).map_err(|error| {
            ConfigError::Invalid(format!("invalid monitor configuration in settings: {error}"))
        })?
    } else {
        MonitorConfig::default()
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

pub fn save_monitor_config(db: &Database, config: &MonitorConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let value = serde_json::to_string(config)?;
    queries::upsert_setting(
        db,
        MONITOR_CONFIG_SETTING_KEY,
        &value,
        &Utc::now().to_rfc3339(),
    )?;
    Ok(())
}

pub fn data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("QUAKEWATCH_DATA_DIR") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(app_data) = std::env::var("APPDATA") {
            return PathBuf::from(app_data).join("Quakewatch");
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".quakewatch");
    }

    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".quakewatch");
    }

    PathBuf::from(".quakewatch")
}

/// Resolve the cache database path, creating the data directory.
pub fn db_path() -> std::io::Result<PathBuf> {
    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(DB_FILE_NAME))
}

fn default_feed_base_url() -> String {
    DEFAULT_FEED_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    2_000
}

fn default_notify_threshold() -> f64 {
    DEFAULT_NOTIFY_THRESHOLD
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_eviction_interval_secs() -> u64 {
    3_600
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: MonitorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.window, FeedWindow::Week);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.effective_bounds(), Bounds::WORLD);
        config.validate().unwrap();
    }

    #[test]
    fn explicit_bounds_override_region() {
        let config = MonitorConfig {
            region: Region::Japan,
            bounds: Some(Bounds {
                min_lat: 0.0,
                max_lat: 1.0,
                min_lng: 0.0,
                max_lng: 1.0,
            }),
            ..MonitorConfig::default()
        };
        assert_eq!(config.effective_bounds().max_lat, 1.0);

        let regional = MonitorConfig {
            region: Region::Japan,
            ..MonitorConfig::default()
        };
        assert_eq!(regional.broadcaster_settings().bounds, Region::Japan.bounds());
    }

    #[test]
    fn overrides_apply_and_ignore_garbage() {
        let mut config = MonitorConfig {
            bounds: Some(Bounds::WORLD),
            ..MonitorConfig::default()
        };
        config.apply_overrides_from(lookup(&[
            ("QUAKEWATCH_FEED_URL", " http://127.0.0.1:8080/feed "),
            ("QUAKEWATCH_REGION", "Indonesia"),
            ("QUAKEWATCH_WINDOW", "fortnight"),
            ("QUAKEWATCH_NOTIFY_THRESHOLD", "5.5"),
        ]));

        assert_eq!(config.feed_base_url, "http://127.0.0.1:8080/feed");
        assert_eq!(config.region, Region::Indonesia);
        assert_eq!(config.bounds, None);
        assert_eq!(config.window, FeedWindow::Week);
        assert_eq!(config.notify_threshold, 5.5);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases = [
            MonitorConfig {
                feed_base_url: "not a url".to_string(),
                ..MonitorConfig::default()
            },
            MonitorConfig {
                timeout_ms: 0,
                ..MonitorConfig::default()
            },
            MonitorConfig {
                max_attempts: 0,
                ..MonitorConfig::default()
            },
            MonitorConfig {
                refresh_interval_secs: 0,
                ..MonitorConfig::default()
            },
            MonitorConfig {
                notify_threshold: f64::NAN,
                ..MonitorConfig::default()
            },
            MonitorConfig {
                bounds: Some(Bounds {
                    min_lat: 10.0,
                    max_lat: -10.0,
                    min_lng: 0.0,
                    max_lng: 1.0,
                }),
                ..MonitorConfig::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "expected rejection for {config:?}"
            );
        }
    }

    #[test]
    fn save_then_load_round_trips_through_settings() {
        let db = Database::open_in_memory().unwrap();
        let config = MonitorConfig {
            window: FeedWindow::Day,
            region: Region::California,
            retention_days: 7,
            ..MonitorConfig::default()
        };
        save_monitor_config(&db, &config).unwrap();

        let raw = queries::get_setting(&db, MONITOR_CONFIG_SETTING_KEY)
            .unwrap()
            .unwrap();
        let stored: MonitorConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, config);
    }

    #[test]
    fn corrupt_settings_are_reported() {
        let db = Database::open_in_memory().unwrap();
        queries::upsert_setting(&db, MONITOR_CONFIG_SETTING_KEY, "{not json", "now").unwrap();
        assert!(matches!(
            load_monitor_config(&db),
            Err(ConfigError::Invalid(_))
        ));
    }
}
