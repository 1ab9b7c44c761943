//! Batteries under /sys/class/power_supply

use crate::sysfs::Sysfs;
use hwmgr_types::{BatteryInfo, ComponentKind, DiscoveredDevice, DriverIdentity, HardwareComponent, Identity, Payload, Reading};

const POWER_SUPPLY: &str = "sys/class/power_supply";

pub(crate) fn discover(sysfs: &Sysfs) -> Vec<DiscoveredDevice> {
    let Ok(supplies) = sysfs.list(POWER_SUPPLY) else {
        return Vec::new();
    };

    let mut devices = Vec::new();
    for supply in supplies {
        let base = format!("{}/{}", POWER_SUPPLY, supply);
        if sysfs.read(&format!("{}/type", base)).ok().as_deref() != Some("Battery") {
            continue;
        }
        let read = |attr: &str| sysfs.read(&format!("{}/{}", base, attr)).unwrap_or_default();
        let info = BatteryInfo {
            design_capacity_wh: design_capacity_wh(sysfs, &base).unwrap_or(0.0),
            charging: read("status") == "Charging",
        };
        let identity = Identity::new(supply.as_str())
            .with_vendor(read("manufacturer"))
            .with_model(read("model_name"))
            .with_serial(read("serial_number"))
            .with_address(supply.as_str());
        devices.push(DiscoveredDevice::new(ComponentKind::Battery, identity, Payload::Battery(info)));
    }
    devices
}

/// energy_full_design is in microwatt-hours
fn design_capacity_wh(sysfs: &Sysfs, base: &str) -> Option<f32> {
    let uwh = sysfs.read_int(&format!("{}/energy_full_design", base)).ok()?;
    Some(uwh as f32 / 1_000_000.0)
}

pub(crate) fn driver(sysfs: &Sysfs, supply: &str) -> Option<DriverIdentity> {
    sysfs
        .device_driver(&format!("{}/{}/device", POWER_SUPPLY, supply))
        .map(|identity| identity.hotplug())
}

pub(crate) fn telemetry(sysfs: &Sysfs, component: &HardwareComponent) -> Option<Reading> {
    let base = format!("{}/{}", POWER_SUPPLY, component.identity.bus_address);
    let charge = sysfs.read_int(&format!("{}/capacity", base)).ok()?;
    let mut reading = Reading::default().with_charge(charge as f32);
    // power_now is in microwatts
    if let Ok(uw) = sysfs.read_int(&format!("{}/power_now", base)) {
        reading = reading.with_power(uw as f32 / 1_000_000.0);
    }
    Some(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::{scratch, write};

    #[test]
    fn test_discovers_batteries_only() {
        let root = scratch("power");
        write(&root, "sys/class/power_supply/AC/type", "Mains\n");
        write(&root, "sys/class/power_supply/BAT0/type", "Battery\n");
        write(&root, "sys/class/power_supply/BAT0/status", "Charging\n");
        write(&root, "sys/class/power_supply/BAT0/manufacturer", "ACME\n");
        write(&root, "sys/class/power_supply/BAT0/energy_full_design", "57000000\n");
        write(&root, "sys/class/power_supply/BAT0/capacity", "12\n");
        let sysfs = Sysfs::new(&root);

        let devices = discover(&sysfs);
        assert_eq!(devices.len(), 1);
        let battery = &devices[0];
        assert_eq!(battery.identity.name, "BAT0");
        assert_eq!(battery.identity.vendor, "ACME");
        match &battery.payload {
            Payload::Battery(info) => {
                assert!(info.charging);
                assert!((info.design_capacity_wh - 57.0).abs() < 0.01);
            }
            other => panic!("unexpected payload {:?}", other),
        }

        let component = HardwareComponent::new(1, battery.kind, battery.identity.clone(), battery.payload.clone());
        assert_eq!(telemetry(&sysfs, &component).unwrap().charge_percent, Some(12.0));
    }
}
