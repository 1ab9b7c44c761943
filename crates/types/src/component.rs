//! Hardware component records

use crate::driver::DriverRecord;
use crate::kind::{ComponentKind, DeviceStatus, PowerState};
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Identifier of a registered component. Never 0.
pub type ComponentId = u32;

/// Identifier of a running monitor. Never 0.
pub type MonitorId = u32;

/// Reserved component id meaning "every component"
pub const ALL_COMPONENTS: ComponentId = 0;

/// Reserved monitor id meaning "every monitor"
pub const ALL_MONITORS: MonitorId = 0;

/// Identity fields of a device as reported by detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub vendor: String,
    pub model: String,
    pub serial: String,
    pub firmware_version: String,
    pub bus_address: String,
    /// Capacity in bytes (storage size, memory size, VRAM); 0 when meaningless
    pub capacity: u64,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    pub fn with_firmware(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = version.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.bus_address = address.into();
        self
    }

    pub fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity = bytes;
        self
    }
}

/// Live status of a component, refreshed by sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: DeviceStatus,
    pub power_state: PowerState,
    /// Degrees Celsius
    pub temperature: f32,
    /// Percent, 0-100
    pub utilization: f32,
    /// Watts
    pub power_usage: f32,
    pub error_count: u32,
    pub last_error_message: String,
    /// Time since the driver was last loaded
    pub uptime: Duration,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            status: DeviceStatus::Unknown,
            power_state: PowerState::Normal,
            temperature: 0.0,
            utilization: 0.0,
            power_usage: 0.0,
            error_count: 0,
            last_error_message: String::new(),
            uptime: Duration::ZERO,
        }
    }
}

/// A tracked hardware device
///
/// Values returned by the registry are snapshots: identity, driver and status
/// are copied, the payload is a shared read-only handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareComponent {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub identity: Identity,
    pub driver: DriverRecord,
    pub status: StatusRecord,
    pub payload: Arc<Payload>,
}

impl HardwareComponent {
    pub fn new(id: ComponentId, kind: ComponentKind, identity: Identity, payload: Payload) -> Self {
        Self {
            id,
            kind,
            identity,
            driver: DriverRecord::default(),
            status: StatusRecord::default(),
            payload: Arc::new(payload),
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Key used to recognise the same physical device across rescans
    pub fn device_key(&self) -> DeviceKey {
        DeviceKey::new(self.kind, &self.identity)
    }
}

/// A device reported by a detection scan, not yet registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub kind: ComponentKind,
    pub identity: Identity,
    pub payload: Payload,
}

impl DiscoveredDevice {
    pub fn new(kind: ComponentKind, identity: Identity, payload: Payload) -> Self {
        Self {
            kind,
            identity,
            payload,
        }
    }

    pub fn device_key(&self) -> DeviceKey {
        DeviceKey::new(self.kind, &self.identity)
    }
}

/// (kind, bus address, name) triple identifying a physical device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    kind: ComponentKind,
    bus_address: String,
    name: String,
}

impl DeviceKey {
    fn new(kind: ComponentKind, identity: &Identity) -> Self {
        Self {
            kind,
            bus_address: identity.bus_address.clone(),
            name: identity.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CpuInfo;

    #[test]
    fn test_new_component_defaults() {
        let component = HardwareComponent::new(
            1,
            ComponentKind::Cpu,
            Identity::new("cpu0").with_vendor("GenuineIntel"),
            Payload::Cpu(CpuInfo::default()),
        );
        assert_eq!(component.status.status, DeviceStatus::Unknown);
        assert_eq!(component.status.power_state, PowerState::Normal);
        assert_eq!(component.name(), "cpu0");
    }

    #[test]
    fn test_device_key_ignores_payload() {
        let identity = Identity::new("eth0").with_address("0000:03:00.0");
        let a = DiscoveredDevice::new(ComponentKind::Network, identity.clone(), Payload::None);
        let b = HardwareComponent::new(7, ComponentKind::Network, identity, Payload::None);
        assert_eq!(a.device_key(), b.device_key());
    }
}
