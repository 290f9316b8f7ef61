//! Persisted daemon settings.
//!
//! Stored as a small JSON document:
//!
//! ```json
//! {"Threshold":200.0,"Interval":2,"Delay":60,"Testing":false}
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::monitor::MonitorConfig;

pub const DEFAULT_THRESHOLD_KBPS: f64 = 200.0;
pub const DEFAULT_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_DELAY_SECS: u64 = 60;

const APP_DIR: &str = "bwmon";
const FILE_NAME: &str = "settings.json";

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "I/O error: {}", e),
            SettingsError::Json(e) => write!(f, "invalid settings file: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Json(e)
    }
}

/// User-editable monitoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    /// KB/s
    pub threshold: f64,
    /// Seconds between samples.
    pub interval: u64,
    /// Seconds below threshold before the trigger fires.
    pub delay: u64,
    pub testing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD_KBPS,
            interval: DEFAULT_INTERVAL_SECS,
            delay: DEFAULT_DELAY_SECS,
            testing: false,
        }
    }
}

impl Settings {
    /// `$XDG_CONFIG_HOME/bwmon/settings.json`, falling back to
    /// `$HOME/.config/bwmon/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .filter(|v| !v.is_empty())
                    .map(|home| PathBuf::from(home).join(".config"))
            })?;
        Some(base.join(APP_DIR).join(FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the settings, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig::new(self.threshold, self.interval, self.delay)
            .with_testing_mode(self.testing)
    }
}
