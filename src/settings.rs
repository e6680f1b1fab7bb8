//! Persisted user preferences.
//!
//! The pipeline never touches this file; the UI owner loads it at startup and
//! saves after every change.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{AppError, SessionConfig};

pub const SETTINGS_FILENAME: &str = "clipfetch_settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_download: bool,
    pub watch_clipboard: bool,
    pub download_directory: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            auto_download: session.auto_download,
            watch_clipboard: false,
            download_directory: session.download_directory,
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        PathBuf::from(".").join(SETTINGS_FILENAME)
    }

    /// Read settings from `path`, falling back to defaults on any problem.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings at {:?}, using defaults", path);
                return Self::default();
            }
            Err(e) => {
                warn!("Failed to read settings from {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => {
                info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse settings from {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::Io(e.to_string()))?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Settings(e.to_string()))?;
        fs::write(path, content).map_err(|e| AppError::Io(e.to_string()))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            auto_download: self.auto_download,
            download_directory: self.download_directory.clone(),
        }
    }
}
