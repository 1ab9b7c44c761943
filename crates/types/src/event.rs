//! Hardware events and the system health gauge

use crate::component::ComponentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Event severity, 0 (informational) to 4 (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info = 0,
    Notice = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl Severity {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Severity::Info),
            1 => Some(Severity::Notice),
            2 => Some(Severity::Warning),
            3 => Some(Severity::Error),
            4 => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Severe events degrade system health and count as errors
    pub fn is_severe(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DeviceAdded,
    DeviceRemoved,
    StatusChanged,
    DriverLoaded,
    DriverUnloaded,
    DriverUpdated,
    DriverDisabled,
    Custom(String),
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::DeviceAdded => f.write_str("device_added"),
            EventType::DeviceRemoved => f.write_str("device_removed"),
            EventType::StatusChanged => f.write_str("status_changed"),
            EventType::DriverLoaded => f.write_str("driver_loaded"),
            EventType::DriverUnloaded => f.write_str("driver_unloaded"),
            EventType::DriverUpdated => f.write_str("driver_updated"),
            EventType::DriverDisabled => f.write_str("driver_disabled"),
            EventType::Custom(name) => f.write_str(name),
        }
    }
}

/// A logged hardware event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareEvent {
    pub id: Uuid,
    /// 0 for system-wide events
    pub component_id: ComponentId,
    pub event_type: EventType,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl HardwareEvent {
    pub fn new(
        component_id: ComponentId,
        event_type: EventType,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            component_id,
            event_type,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Snapshot of the system health gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemHealth {
    /// 0-100, only ever lowered by severe events
    pub health: u8,
    pub total_errors: u64,
    /// Components whose driver is Loaded or Active
    pub driver_count: usize,
    pub events_logged: u64,
    /// Events pushed out of the bounded event log
    pub events_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_levels() {
        assert_eq!(Severity::from_level(4), Some(Severity::Critical));
        assert_eq!(Severity::from_level(5), None);
        assert!(Severity::Error.is_severe());
        assert!(!Severity::Warning.is_severe());
    }

    #[test]
    fn test_event_serialization() {
        let event = HardwareEvent::new(3, EventType::StatusChanged, Severity::Critical, "hot");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"severity\":\"critical\""));

        let back: HardwareEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.event_type, EventType::StatusChanged);
    }
}
