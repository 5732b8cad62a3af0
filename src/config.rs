use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, snooze::SnoozeSettings};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// directory holding the sound assets, defaults to the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sounds_path: Option<PathBuf>,
    /// file the alarms are stored in, defaults to the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarms_path: Option<PathBuf>,
    // tables go last in toml
    #[serde(default)]
    pub snooze: SnoozeSettings,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// reads the config at `path`, a missing file means the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&config)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, config).map_err(io_error)
    }

    fn project_dirs() -> Result<ProjectDirs, ConfigError> {
        ProjectDirs::from("", "", "reveille").ok_or(ConfigError::NoProjectDirs)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = Self::project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    pub fn is_config_present() -> Result<bool, ConfigError> {
        Ok(Self::config_path()?.exists())
    }

    pub fn alarms_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.alarms_path {
            return Ok(path.clone());
        }
        let mut path = Self::project_dirs()?.data_dir().to_path_buf();
        path.push("alarms.toml");
        Ok(path)
    }

    pub fn sounds_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.sounds_path {
            return Ok(path.clone());
        }
        let mut path = Self::project_dirs()?.data_dir().to_path_buf();
        path.push("sounds");
        Ok(path)
    }
}
