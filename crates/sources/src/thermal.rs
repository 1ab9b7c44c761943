//! Temperature sensors reported by sysinfo components

use crate::probe::Probe;
use crate::sysfs::Sysfs;
use hwmgr_types::{ComponentKind, DiscoveredDevice, DriverIdentity, HardwareComponent, Identity, Payload, Reading, SensorInfo};

pub(crate) fn discover(probe: &Probe) -> Vec<DiscoveredDevice> {
    probe
        .components
        .list()
        .iter()
        .map(|component| {
            let label = component.label().to_string();
            let info = SensorInfo {
                label: label.clone(),
                unit: "C".to_string(),
                critical: component.critical().filter(|c| c.is_finite()),
            };
            let identity = Identity::new(label.as_str()).with_address(chip_name(&label));
            DiscoveredDevice::new(ComponentKind::Sensor, identity, Payload::Sensor(info))
        })
        .collect()
}

/// hwmon chip prefix of a sysinfo label: "coretemp Package id 0" -> "coretemp"
fn chip_name(label: &str) -> &str {
    label.split_whitespace().next().unwrap_or(label)
}

pub(crate) fn driver(sysfs: &Sysfs, label: &str) -> Option<DriverIdentity> {
    let chip = chip_name(label);
    if chip.is_empty() {
        return None;
    }
    let mut identity = sysfs.module(chip);
    if identity.install_path.is_empty() {
        identity.install_path = sysfs.path("sys/class/hwmon").display().to_string();
    }
    Some(identity)
}

pub(crate) fn telemetry(probe: &Probe, component: &HardwareComponent) -> Option<Reading> {
    probe
        .components
        .list()
        .iter()
        .find(|c| c.label() == component.name())
        .map(|c| c.temperature())
        .filter(|t| t.is_finite())
        .map(Reading::temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_name() {
        assert_eq!(chip_name("coretemp Package id 0"), "coretemp");
        assert_eq!(chip_name("acpitz"), "acpitz");
        assert_eq!(chip_name(""), "");
    }
}
