//! Server configuration from environment variables
//!
//! | Variable                          | Default  |
//! |-----------------------------------|----------|
//! | `SOURDOUGH_PORT`                  | `8080`   |
//! | `SOURDOUGH_DATA_DIR`              | `./data` |
//! | `SOURDOUGH_HA_URL`                | unset    |
//! | `SOURDOUGH_HA_TOKEN`              | unset    |
//! | `SOURDOUGH_HA_ENTITY`             | unset    |
//! | `SOURDOUGH_SENSOR_TIMEOUT_SECS`   | `5`      |
//! | `SOURDOUGH_AUTOLOG_INTERVAL_SECS` | `14400`  |
//!
//! The sensor is enabled only when URL, token and entity are all set.
//! An auto-log interval of `0` disables periodic logging.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_SENSOR_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_AUTOLOG_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

/// Home Assistant sensor settings
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub entity_id: Option<String>,
    pub timeout: Duration,
}

impl SensorConfig {
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.token.is_some() && self.entity_id.is_some()
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            entity_id: None,
            timeout: DEFAULT_SENSOR_TIMEOUT,
        }
    }
}

/// Everything the server binary needs to start
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub sensor: SensorConfig,
    /// `None` disables auto-logging
    pub autolog_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            sensor: SensorConfig::default(),
            autolog_interval: Some(DEFAULT_AUTOLOG_INTERVAL),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        let port = parse_or(&text, "SOURDOUGH_PORT", defaults.port);
        let data_dir = text("SOURDOUGH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let timeout_secs = parse_or(
            &text,
            "SOURDOUGH_SENSOR_TIMEOUT_SECS",
            DEFAULT_SENSOR_TIMEOUT.as_secs(),
        );
        let sensor = SensorConfig {
            base_url: text("SOURDOUGH_HA_URL"),
            token: text("SOURDOUGH_HA_TOKEN"),
            entity_id: text("SOURDOUGH_HA_ENTITY"),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        };

        let autolog_secs = parse_or(
            &text,
            "SOURDOUGH_AUTOLOG_INTERVAL_SECS",
            DEFAULT_AUTOLOG_INTERVAL.as_secs(),
        );
        let autolog_interval = (autolog_secs > 0).then(|| Duration::from_secs(autolog_secs));

        Self {
            port,
            data_dir,
            sensor,
            autolog_interval,
        }
    }
}

fn parse_or<T, F>(text: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match text(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "invalid value, using default");
            default
        }),
    }
}
