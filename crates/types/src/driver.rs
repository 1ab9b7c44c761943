//! Driver records and the driver lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the driver bound to a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    #[default]
    Unknown,
    Missing,
    Installed,
    Loaded,
    Active,
    Error,
    Disabled,
    Outdated,
}

impl DriverState {
    /// Loaded and Active are the states counted by the system health `driver_count`
    pub fn is_loaded(&self) -> bool {
        matches!(self, DriverState::Loaded | DriverState::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverState::Unknown => "unknown",
            DriverState::Missing => "missing",
            DriverState::Installed => "installed",
            DriverState::Loaded => "loaded",
            DriverState::Active => "active",
            DriverState::Error => "error",
            DriverState::Disabled => "disabled",
            DriverState::Outdated => "outdated",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver information embedded in every component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub name: String,
    pub version: String,
    pub install_path: String,
    pub state: DriverState,
    pub is_opensource: bool,
    pub is_kernel_module: bool,
    pub supports_hotplug: bool,
    /// Set on every successful load
    pub load_time: Option<DateTime<Utc>>,
}

impl DriverRecord {
    /// Copy the identity fields reported by a detection source into this record
    ///
    /// The lifecycle state and load time are left alone.
    pub fn apply_identity(&mut self, identity: &DriverIdentity) {
        self.name = identity.name.clone();
        self.version = identity.version.clone();
        self.install_path = identity.install_path.clone();
        self.is_opensource = identity.is_opensource;
        self.is_kernel_module = identity.is_kernel_module;
        self.supports_hotplug = identity.supports_hotplug;
    }
}

/// Driver identity as reported by a detection source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverIdentity {
    pub name: String,
    pub version: String,
    pub install_path: String,
    pub is_opensource: bool,
    pub is_kernel_module: bool,
    pub supports_hotplug: bool,
    /// The source already knows a newer version exists
    #[serde(default)]
    pub outdated: bool,
}

impl DriverIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_install_path(mut self, path: impl Into<String>) -> Self {
        self.install_path = path.into();
        self
    }

    pub fn kernel_module(mut self, opensource: bool) -> Self {
        self.is_kernel_module = true;
        self.is_opensource = opensource;
        self
    }

    pub fn hotplug(mut self) -> Self {
        self.supports_hotplug = true;
        self
    }

    pub fn outdated(mut self) -> Self {
        self.outdated = true;
        self
    }
}
