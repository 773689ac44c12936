use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, Result};

const APP_DIR: &str = "kiwix-library";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub library: LibraryConfig,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory (holds the catalog database).
    pub data_dir: Option<PathBuf>,
    /// Directory scanned for downloaded archives.
    pub archive_dir: Option<PathBuf>,
}

/// Catalog behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Catalog feed used by `refresh` when no path is given.
    pub feed_path: Option<PathBuf>,
    /// Share of free space a download may take before it needs confirmation.
    pub caution_ratio: f64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            feed_path: None,
            caution_ratio: 0.8,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/kiwix-library/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let Some(config_path) = Self::config_path() else {
            log::debug!("No config directory on this platform, using defaults");
            return Self::default();
        };
        match Self::load_from(&config_path) {
            Ok(config) => {
                log::info!("Loaded config from {}", config_path.display());
                config
            }
            Err(LibraryError::Io(_)) => {
                log::debug!("No config file at {}, using defaults", config_path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse config at {}: {}, using defaults",
                    config_path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Directory holding the catalog database
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .map(|dir| dir.join(APP_DIR))
            .ok_or(LibraryError::NoDataDir)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("library.db"))
    }

    /// Directory scanned for local archives, defaulting to `<data_dir>/archives`
    pub fn archive_dir(&self) -> Result<PathBuf> {
        match &self.data.archive_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join("archives")),
        }
    }
}
