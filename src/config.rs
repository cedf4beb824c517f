//! Application configuration management.
//!
//! A small JSON file at the platform config directory carries the defaults
//! a CLI invocation would otherwise repeat: the scan root and the inventory
//! database location. CLI flags always win over the file.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Persisted application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default root directory to scan.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Inventory database path. Defaults to the platform data directory.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// Move deleted files to the system trash instead of unlinking.
    #[serde(default)]
    pub use_trash: bool,
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    /// Missing or unreadable files fall back to defaults.
    #[must_use]
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the configuration to the default platform-specific path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The inventory database path: configured value, or the platform data
    /// directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("inventory.db"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "nasdupe", "nasdupe")
        .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))
}
