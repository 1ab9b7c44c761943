//! Application configuration file

use anyhow::{Context, Result};
use hwmgr_core::ManagerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

/// Everything stored in `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    /// Settings handed to the hardware manager
    #[serde(default)]
    pub manager: ManagerConfig,
    /// CLI presentation defaults
    #[serde(default)]
    pub display: DisplayConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            manager: ManagerConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Defaults for the `list` and `watch` commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Print JSON instead of tables
    #[serde(default)]
    pub json: bool,
    /// Largest number of components `list` prints
    #[serde(default = "default_max_components")]
    pub max_components: usize,
    /// Monitor interval for `watch` in milliseconds (0 = manager default)
    #[serde(default)]
    pub watch_interval_ms: u64,
}

fn default_max_components() -> usize {
    256
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            json: false,
            max_components: default_max_components(),
            watch_interval_ms: 0,
        }
    }
}

impl AppConfig {
    /// Load from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("org", "hwmgr", "hwmgr")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if config.version > CONFIG_VERSION {
            log::warn!(
                "Config {} has version {}, newer than supported {}",
                path.display(),
                config.version,
                CONFIG_VERSION
            );
        }
        config
            .manager
            .validate()
            .with_context(|| format!("Invalid manager settings in {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hwmgr-config-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("config.json")
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = AppConfig::load_from_path(&scratch("missing")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("save");
        let mut config = AppConfig::default();
        config.manager.auto_driver_update = true;
        config.display.json = true;
        config.save_to_path(&path).unwrap();

        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = scratch("partial");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"manager": {"scan_interval": 30}}"#).unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.manager.scan_interval, 30);
        assert!(config.manager.enable_monitoring);
        assert_eq!(config.display.max_components, 256);
    }

    #[test]
    fn test_invalid_manager_settings_rejected() {
        let path = scratch("invalid");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"manager": {"log_level": 7}}"#).unwrap();
        assert!(AppConfig::load_from_path(&path).is_err());
    }
}
