//! Hardware manager configuration

use crate::error::{HwError, HwResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options recognised by the hardware manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Drop components that vanish between scans (hotplug-capable drivers only)
    #[serde(default = "default_true")]
    pub enable_hotplug: bool,
    /// Allow background monitors to be started
    #[serde(default = "default_true")]
    pub enable_monitoring: bool,
    /// Seconds between rescans when the host rescans periodically
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    /// Default polling period in seconds for monitors started with interval 0
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval: u64,
    #[serde(default)]
    pub enable_ai_optimization: bool,
    /// Update outdated drivers of newly scanned components
    #[serde(default)]
    pub auto_driver_update: bool,
    /// Refuse to load drivers without a known install path
    #[serde(default = "default_true")]
    pub security_checks: bool,
    /// 0 = warn, 1 = info, 2 = debug, 3 = trace
    #[serde(default = "default_log_level")]
    pub log_level: u8,
    /// Repository consulted for driver updates
    #[serde(default)]
    pub driver_repo_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_scan_interval() -> u64 {
    5
}

fn default_monitor_interval() -> u64 {
    1
}

fn default_log_level() -> u8 {
    1
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            enable_hotplug: true,
            enable_monitoring: true,
            scan_interval: default_scan_interval(),
            monitor_interval: default_monitor_interval(),
            enable_ai_optimization: false,
            auto_driver_update: false,
            security_checks: true,
            log_level: default_log_level(),
            driver_repo_url: None,
        }
    }
}

impl ManagerConfig {
    /// Reject values the manager cannot work with
    pub fn validate(&self) -> HwResult<()> {
        if self.log_level > 3 {
            return Err(HwError::Config(format!(
                "log_level must be 0-3, got {}",
                self.log_level
            )));
        }
        if self.scan_interval == 0 {
            return Err(HwError::Config("scan_interval must be at least 1 second".to_string()));
        }
        if self.monitor_interval == 0 {
            return Err(HwError::Config(
                "monitor_interval must be at least 1 second".to_string(),
            ));
        }
        if let Some(url) = &self.driver_repo_url {
            let known_scheme = ["http://", "https://", "file://"]
                .iter()
                .any(|scheme| url.starts_with(scheme));
            if !known_scheme {
                return Err(HwError::Config(format!("unsupported driver_repo_url: {}", url)));
            }
        }
        Ok(())
    }

    pub fn scan_period(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn monitor_period(&self) -> Duration {
        Duration::from_secs(self.monitor_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ManagerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: ManagerConfig = serde_json::from_str(r#"{"log_level": 3}"#).unwrap();
        assert_eq!(config.log_level, 3);
        assert!(config.enable_monitoring);
        assert_eq!(config.scan_interval, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ManagerConfig {
            log_level: 7,
            ..ManagerConfig::default()
        };
        assert!(matches!(config.validate(), Err(HwError::Config(_))));

        let config = ManagerConfig {
            driver_repo_url: Some("ftp://mirror".to_string()),
            ..ManagerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
