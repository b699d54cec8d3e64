use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reminders closer than this are skipped as too late to be useful.
pub const DEFAULT_LEAD_MINUTES: i64 = 5;
/// Persisted "playing" state older than this is ignored on startup.
pub const DEFAULT_STALE_AFTER_MINUTES: i64 = 5;

fn default_latitude() -> f64 {
    33.6938
}
fn default_longitude() -> f64 {
    73.0651
}
fn default_location_name() -> String {
    "Islamabad".to_string()
}
fn default_calc_method() -> String {
    "Karachi".to_string()
}
fn default_base_url() -> String {
    "https://api.aladhan.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_lead_minutes() -> i64 {
    DEFAULT_LEAD_MINUTES
}
fn default_stale_after_minutes() -> i64 {
    DEFAULT_STALE_AFTER_MINUTES
}
fn default_load_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_location_name")]
    pub name: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default = "default_calc_method")]
    pub calc_method: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: default_location_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            calc_method: default_calc_method(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            lead_minutes: default_lead_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzanConfig {
    /// Defaults to `azan.mp3` in the data directory.
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
    /// Start the azan when a reminder fires in the daemon.
    #[serde(default = "default_true")]
    pub play_on_reminder: bool,
}

impl Default for AzanConfig {
    fn default() -> Self {
        Self {
            audio_path: None,
            stale_after_minutes: default_stale_after_minutes(),
            load_timeout_secs: default_load_timeout_secs(),
            play_on_reminder: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub azan: AzanConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "miqat")
            .context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("miqat.db"))
    }

    pub fn audio_path(&self) -> Result<PathBuf> {
        match &self.azan.audio_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("azan.mp3")),
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Parsing config.toml")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(&path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn lead_time(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminders.lead_minutes.max(0))
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.azan.stale_after_minutes.max(0))
    }
}
