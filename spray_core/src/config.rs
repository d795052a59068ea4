//! Configuration file support for Spraytrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/spraytrack/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Alerting parameters.
///
/// The tolerance and lead windows come from the original tracker as
/// fixed numbers; here they are tunable defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// How far a dose may land from a scheduled time and still count (minutes)
    #[serde(default = "default_tolerance_minutes")]
    pub tolerance_minutes: i64,

    /// How long before a scheduled time a reminder may fire (minutes)
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,

    /// Snooze duration before the same slot may re-alert (minutes)
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: i64,

    /// Watch-loop polling period (seconds)
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            tolerance_minutes: default_tolerance_minutes(),
            lead_minutes: default_lead_minutes(),
            snooze_minutes: default_snooze_minutes(),
            poll_seconds: default_poll_seconds(),
        }
    }
}

/// History view configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// How many days of history the detailed view covers
    #[serde(default = "default_recent_days")]
    pub recent_days: i64,

    /// How many entries the dashboard-style summary shows
    #[serde(default = "default_recent_entries")]
    pub recent_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_days: default_recent_days(),
            recent_entries: default_recent_entries(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("spraytrack")
}

fn default_tolerance_minutes() -> i64 {
    30
}

fn default_lead_minutes() -> i64 {
    5
}

fn default_snooze_minutes() -> i64 {
    5
}

fn default_poll_seconds() -> u64 {
    60
}

fn default_recent_days() -> i64 {
    30
}

fn default_recent_entries() -> usize {
    10
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("spraytrack").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
