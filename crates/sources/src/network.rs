//! Network interfaces

use crate::probe::Probe;
use crate::sysfs::Sysfs;
use hwmgr_types::{
    ComponentKind, DiscoveredDevice, DriverIdentity, HardwareComponent, Identity, NetworkInfo, Payload,
    Reading,
};

/// Interfaces backed by a physical device; virtual ones (lo, bridges, veth) are skipped
pub(crate) fn discover(probe: &Probe, sysfs: &Sysfs) -> Vec<DiscoveredDevice> {
    let mut names: Vec<&String> = probe.networks.list().keys().collect();
    names.sort();

    let mut devices = Vec::new();
    for name in names {
        let base = format!("sys/class/net/{}", name);
        if !sysfs.exists(&format!("{}/device", base)) {
            log::trace!("Skipping virtual interface {}", name);
            continue;
        }
        let mac_address = probe
            .networks
            .list()
            .get(name.as_str())
            .map(|data| data.mac_address().to_string())
            .unwrap_or_default();
        let info = NetworkInfo {
            interface: name.clone(),
            mac_address: mac_address.clone(),
            link_speed_mbps: link_speed(sysfs, name).unwrap_or(0),
            wireless: sysfs.exists(&format!("{}/wireless", base)),
        };
        let identity = Identity::new(name.as_str())
            .with_address(device_address(sysfs, name).unwrap_or_else(|| name.clone()))
            .with_serial(mac_address);
        devices.push(DiscoveredDevice::new(ComponentKind::Network, identity, Payload::Network(info)));
    }
    devices
}

/// Negotiated speed; sysfs reports -1 while the link is down
fn link_speed(sysfs: &Sysfs, interface: &str) -> Option<u32> {
    let speed = sysfs.read_int(&format!("sys/class/net/{}/speed", interface)).ok()?;
    u32::try_from(speed).ok()
}

/// PCI or USB address of the device behind an interface
fn device_address(sysfs: &Sysfs, interface: &str) -> Option<String> {
    sysfs.link_name(&format!("sys/class/net/{}/device", interface)).ok()
}

pub(crate) fn driver(sysfs: &Sysfs, interface: &str) -> Option<DriverIdentity> {
    let device = format!("sys/class/net/{}/device", interface);
    let mut identity = sysfs.device_driver(&device)?;
    // USB adapters come and go
    identity.supports_hotplug = sysfs
        .link_name(&format!("{}/subsystem", device))
        .map(|subsystem| subsystem == "usb")
        .unwrap_or(false);
    Some(identity)
}

pub(crate) fn telemetry(sysfs: &Sysfs, component: &HardwareComponent) -> Option<Reading> {
    let interface = match component.payload.as_ref() {
        Payload::Network(info) => info.interface.as_str(),
        _ => component.name(),
    };
    let state = sysfs.read(&format!("sys/class/net/{}/operstate", interface)).ok()?;
    link_state(&state).map(|up| Reading::default().with_link(up))
}

/// "up" and "down" are definite; "unknown" and "dormant" tell us nothing
fn link_state(operstate: &str) -> Option<bool> {
    match operstate {
        "up" => Some(true),
        "down" | "lowerlayerdown" | "notpresent" => Some(false),
        _ => None,
    }
}
