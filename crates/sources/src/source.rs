//! Detection source backed by sysinfo and sysfs

use crate::sysfs::Sysfs;
use crate::{catalog, cpu, disk, gpu, memory, network, power, probe, thermal};
use hwmgr_core::DetectionSource;
use hwmgr_types::{
    ComponentKind, DiscoveredDevice, DriverIdentity, DriverRecord, HardwareComponent, HwResult,
    Identity, Reading,
};

/// Kinds this source can discover
pub const SUPPORTED_KINDS: &[ComponentKind] = &[
    ComponentKind::Cpu,
    ComponentKind::Gpu,
    ComponentKind::Memory,
    ComponentKind::Storage,
    ComponentKind::Network,
    ComponentKind::Battery,
    ComponentKind::Sensor,
];

/// Kinds discovered through the shared sysinfo probe
const PROBED_KINDS: &[ComponentKind] = &[
    ComponentKind::Cpu,
    ComponentKind::Memory,
    ComponentKind::Storage,
    ComponentKind::Network,
    ComponentKind::Sensor,
];

/// Live hardware on the local Linux machine
pub struct SysinfoSource {
    sysfs: Sysfs,
    kinds: Vec<ComponentKind>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            sysfs: Sysfs::default(),
            kinds: SUPPORTED_KINDS.to_vec(),
        }
    }

    /// Read sysfs/procfs from `sysfs` instead of the live tree
    pub fn with_sysfs(mut self, sysfs: Sysfs) -> Self {
        self.sysfs = sysfs;
        self
    }

    /// Restrict discovery to `kinds`
    pub fn with_kinds(mut self, kinds: &[ComponentKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    fn wants(&self, kind: ComponentKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionSource for SysinfoSource {
    fn name(&self) -> &str {
        "sysinfo"
    }

    fn scan(&self) -> HwResult<Vec<DiscoveredDevice>> {
        let probed = PROBED_KINDS.iter().any(|kind| self.wants(*kind));
        let mut devices = if probed {
            probe::rescan(|probe| {
                let mut devices = Vec::new();
                if self.wants(ComponentKind::Cpu) {
                    devices.extend(cpu::discover(probe, &self.sysfs));
                }
                if self.wants(ComponentKind::Memory) {
                    devices.extend(memory::discover(probe));
                }
                if self.wants(ComponentKind::Storage) {
                    devices.extend(disk::discover(probe));
                }
                if self.wants(ComponentKind::Network) {
                    devices.extend(network::discover(probe, &self.sysfs));
                }
                if self.wants(ComponentKind::Sensor) {
                    devices.extend(thermal::discover(probe));
                }
                devices
            })
        } else {
            Vec::new()
        };
        if self.wants(ComponentKind::Gpu) {
            devices.extend(gpu::discover(&self.sysfs));
        }
        if self.wants(ComponentKind::Battery) {
            devices.extend(power::discover(&self.sysfs));
        }
        log::debug!("sysinfo scan found {} device(s)", devices.len());
        Ok(devices)
    }

    fn match_driver(&self, kind: ComponentKind, identity: &Identity) -> Option<DriverIdentity> {
        let sysfs = &self.sysfs;
        match kind {
            ComponentKind::Cpu => cpu::driver(sysfs),
            ComponentKind::Memory => memory::driver(sysfs),
            ComponentKind::Storage => disk::driver(sysfs, &identity.bus_address),
            ComponentKind::Network => network::driver(sysfs, &identity.name),
            ComponentKind::Gpu => gpu::driver(sysfs, &identity.bus_address),
            ComponentKind::Battery => power::driver(sysfs, &identity.bus_address),
            ComponentKind::Sensor => thermal::driver(sysfs, &identity.name),
            _ => None,
        }
    }

    fn check_update(&self, driver: &DriverRecord, repo_url: Option<&str>) -> HwResult<Option<String>> {
        match repo_url {
            Some(url) => catalog::newer_version(url, &driver.name, &driver.version),
            None => Ok(None),
        }
    }

    fn read_telemetry(&self, component: &HardwareComponent) -> Option<Reading> {
        let sysfs = &self.sysfs;
        match component.kind {
            ComponentKind::Cpu => probe::sample(cpu::telemetry),
            ComponentKind::Memory => probe::sample(memory::telemetry),
            ComponentKind::Storage => probe::sample(|probe| disk::telemetry(probe, component)),
            ComponentKind::Sensor => probe::sample(|probe| thermal::telemetry(probe, component)),
            ComponentKind::Network => network::telemetry(sysfs, component),
            ComponentKind::Gpu => gpu::telemetry(sysfs, component),
            ComponentKind::Battery => power::telemetry(sysfs, component),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::{scratch, write};

    #[test]
    fn test_battery_only_scan() {
        let root = scratch("source");
        write(&root, "sys/class/power_supply/BAT1/type", "Battery\n");
        write(&root, "sys/class/power_supply/BAT1/capacity", "4\n");
        let source = SysinfoSource::new()
            .with_sysfs(Sysfs::new(&root))
            .with_kinds(&[ComponentKind::Battery]);

        let devices = source.scan().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].kind, ComponentKind::Battery);
        // No device link, so no driver can be matched
        assert!(source.match_driver(ComponentKind::Battery, &devices[0].identity).is_none());
    }

    #[test]
    fn test_updates_need_a_repository() {
        let source = SysinfoSource::new();
        let driver = DriverRecord {
            name: "e1000e".to_string(),
            version: "3.8.4".to_string(),
            ..DriverRecord::default()
        };
        assert_eq!(source.check_update(&driver, None).unwrap(), None);
        assert!(source.match_driver(ComponentKind::Printer, &Identity::new("lp0")).is_none());
    }
}
