//! Detection source trait and a scripted implementation
//!
//! A detection source is everything the core knows about real hardware: it
//! reports discovered devices, matches them to driver identities, answers
//! "is there a newer driver" and optionally supplies live telemetry.

use hwmgr_types::{
    ComponentKind, DiscoveredDevice, DriverIdentity, DriverRecord, HardwareComponent, HwResult,
    Identity, Reading,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Trait for all detection sources
///
/// Implementations must be cheap to call: `read_telemetry` runs while the
/// registry lock is held by a monitor.
pub trait DetectionSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Enumerate the devices currently present
    fn scan(&self) -> HwResult<Vec<DiscoveredDevice>>;

    /// Find the driver governing a device, `None` if no driver matches
    fn match_driver(&self, kind: ComponentKind, identity: &Identity) -> Option<DriverIdentity>;

    /// Newer version available for `driver`, if any
    fn check_update(&self, _driver: &DriverRecord, _repo_url: Option<&str>) -> HwResult<Option<String>> {
        Ok(None)
    }

    /// Current telemetry for `component`, if the source can measure it
    fn read_telemetry(&self, _component: &HardwareComponent) -> Option<Reading> {
        None
    }
}

/// Type-erased detection source
pub type SharedDetectionSource = Arc<dyn DetectionSource>;

#[derive(Default)]
struct Script {
    devices: Vec<DiscoveredDevice>,
    drivers: HashMap<String, DriverIdentity>,
    updates: HashMap<String, String>,
    readings: HashMap<String, VecDeque<Reading>>,
}

/// Deterministic detection source driven by a script
///
/// Drivers are matched by component name, updates by driver name, and
/// telemetry readings are queued per component name and consumed one per
/// sample. Useful for demos and for exercising the manager in tests.
#[derive(Default)]
pub struct ScriptedDetection {
    script: Mutex<Script>,
}

impl ScriptedDetection {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // A panic in another test thread must not wedge the script
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a device reported by every subsequent scan
    pub fn with_device(self, device: DiscoveredDevice) -> Self {
        self.script().devices.push(device);
        self
    }

    /// Match components named `component` to `driver`
    pub fn with_driver(self, component: &str, driver: DriverIdentity) -> Self {
        self.script().drivers.insert(component.to_string(), driver);
        self
    }

    /// Advertise `version` as the newest release of `driver`
    pub fn with_update(self, driver: &str, version: &str) -> Self {
        self.set_update(driver, version);
        self
    }

    pub fn set_update(&self, driver: &str, version: &str) {
        self.script().updates.insert(driver.to_string(), version.to_string());
    }

    /// Replace the devices reported by future scans
    pub fn set_devices(&self, devices: Vec<DiscoveredDevice>) {
        self.script().devices = devices;
    }

    /// Queue one reading for the component named `component`
    pub fn push_reading(&self, component: &str, reading: Reading) {
        self.script()
            .readings
            .entry(component.to_string())
            .or_default()
            .push_back(reading);
    }

    /// Number of queued readings not yet consumed for `component`
    pub fn pending_readings(&self, component: &str) -> usize {
        self.script().readings.get(component).map_or(0, VecDeque::len)
    }
}

impl DetectionSource for ScriptedDetection {
    fn name(&self) -> &str {
        "scripted"
    }

    fn scan(&self) -> HwResult<Vec<DiscoveredDevice>> {
        Ok(self.script().devices.clone())
    }

    fn match_driver(&self, _kind: ComponentKind, identity: &Identity) -> Option<DriverIdentity> {
        self.script().drivers.get(&identity.name).cloned()
    }

    fn check_update(&self, driver: &DriverRecord, _repo_url: Option<&str>) -> HwResult<Option<String>> {
        let script = self.script();
        Ok(script
            .updates
            .get(&driver.name)
            .filter(|version| **version != driver.version)
            .cloned())
    }

    fn read_telemetry(&self, component: &HardwareComponent) -> Option<Reading> {
        self.script()
            .readings
            .get_mut(component.name())
            .and_then(VecDeque::pop_front)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwmgr_types::Payload;

    #[test]
    fn test_scripted_readings_are_consumed_in_order() {
        let source = ScriptedDetection::new();
        source.push_reading("cpu0", Reading::temperature(40.0));
        source.push_reading("cpu0", Reading::temperature(41.0));

        let component = HardwareComponent::new(1, ComponentKind::Cpu, Identity::new("cpu0"), Payload::None);
        assert_eq!(source.read_telemetry(&component).unwrap().temperature, Some(40.0));
        assert_eq!(source.pending_readings("cpu0"), 1);
        assert_eq!(source.read_telemetry(&component).unwrap().temperature, Some(41.0));
        assert!(source.read_telemetry(&component).is_none());
    }

    #[test]
    fn test_update_only_reported_when_version_differs() {
        let source = ScriptedDetection::new().with_update("e1000e", "3.8.7");
        let mut driver = DriverRecord {
            name: "e1000e".to_string(),
            version: "3.8.4".to_string(),
            ..DriverRecord::default()
        };
        assert_eq!(source.check_update(&driver, None).unwrap(), Some("3.8.7".to_string()));

        driver.version = "3.8.7".to_string();
        assert_eq!(source.check_update(&driver, None).unwrap(), None);
    }
}
