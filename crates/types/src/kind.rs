//! Hardware kind, device status and power state enumerations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of a tracked hardware component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Cpu,
    Gpu,
    Memory,
    Storage,
    Network,
    Audio,
    Usb,
    Bluetooth,
    Display,
    Input,
    Battery,
    Sensor,
    Camera,
    Printer,
    Other,
    /// Also used as the "match everything" filter for listing
    #[default]
    Unknown,
}

impl ComponentKind {
    /// Every kind, in declaration order
    pub const ALL: [ComponentKind; 16] = [
        ComponentKind::Cpu,
        ComponentKind::Gpu,
        ComponentKind::Memory,
        ComponentKind::Storage,
        ComponentKind::Network,
        ComponentKind::Audio,
        ComponentKind::Usb,
        ComponentKind::Bluetooth,
        ComponentKind::Display,
        ComponentKind::Input,
        ComponentKind::Battery,
        ComponentKind::Sensor,
        ComponentKind::Camera,
        ComponentKind::Printer,
        ComponentKind::Other,
        ComponentKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Cpu => "CPU",
            ComponentKind::Gpu => "GPU",
            ComponentKind::Memory => "Memory",
            ComponentKind::Storage => "Storage",
            ComponentKind::Network => "Network",
            ComponentKind::Audio => "Audio",
            ComponentKind::Usb => "USB",
            ComponentKind::Bluetooth => "Bluetooth",
            ComponentKind::Display => "Display",
            ComponentKind::Input => "Input",
            ComponentKind::Battery => "Battery",
            ComponentKind::Sensor => "Sensor",
            ComponentKind::Camera => "Camera",
            ComponentKind::Printer => "Printer",
            ComponentKind::Other => "Other",
            ComponentKind::Unknown => "Unknown",
        }
    }

    /// Whether a component of kind `other` passes this kind used as a list filter
    pub fn matches(&self, other: ComponentKind) -> bool {
        *self == ComponentKind::Unknown || *self == other
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ComponentKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown component kind: {}", s))
    }
}

/// Health status of a single component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    #[default]
    Unknown,
    Ok,
    Warning,
    Error,
    Critical,
    Disabled,
    Suspended,
    NotPresent,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Unknown => "unknown",
            DeviceStatus::Ok => "ok",
            DeviceStatus::Warning => "warning",
            DeviceStatus::Error => "error",
            DeviceStatus::Critical => "critical",
            DeviceStatus::Disabled => "disabled",
            DeviceStatus::Suspended => "suspended",
            DeviceStatus::NotPresent => "not present",
        }
    }

    /// Ordering used when several threshold rules disagree (higher is worse)
    pub fn rank(&self) -> u8 {
        match self {
            DeviceStatus::Unknown => 0,
            DeviceStatus::Ok => 1,
            DeviceStatus::Warning => 2,
            DeviceStatus::Error => 3,
            DeviceStatus::Critical => 4,
            DeviceStatus::Disabled | DeviceStatus::Suspended | DeviceStatus::NotPresent => 0,
        }
    }

    /// The worse of two sampled statuses
    pub fn worst(self, other: DeviceStatus) -> DeviceStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power state of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    #[default]
    Unknown,
    Normal,
    Saving,
    HighPerf,
    Off,
    Sleep,
}

impl PowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::Unknown => "unknown",
            PowerState::Normal => "normal",
            PowerState::Saving => "saving",
            PowerState::HighPerf => "high performance",
            PowerState::Off => "off",
            PowerState::Sleep => "sleep",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
