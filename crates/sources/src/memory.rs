//! System memory

use crate::probe::Probe;
use crate::sysfs::Sysfs;
use hwmgr_types::{ComponentKind, DiscoveredDevice, DriverIdentity, Identity, MemoryInfo, Payload, Reading};

pub(crate) fn discover(probe: &Probe) -> Vec<DiscoveredDevice> {
    let total = probe.system.total_memory();
    if total == 0 {
        return Vec::new();
    }
    let info = MemoryInfo {
        total_bytes: total,
        swap_bytes: probe.system.total_swap(),
    };
    let identity = Identity::new("System memory")
        .with_address("mem0")
        .with_capacity(total);
    vec![DiscoveredDevice::new(ComponentKind::Memory, identity, Payload::Memory(info))]
}

/// EDAC memory controller driver when present, otherwise the core memory manager
pub(crate) fn driver(sysfs: &Sysfs) -> Option<DriverIdentity> {
    if let Ok(name) = sysfs.read("sys/devices/system/edac/mc/mc0/mc_name") {
        let mut identity = sysfs.module(&name.to_lowercase().replace(' ', "_"));
        identity.name = name;
        if identity.install_path.is_empty() {
            identity.install_path = sysfs.path("sys/devices/system/edac/mc/mc0").display().to_string();
        }
        return Some(identity);
    }
    Some(
        DriverIdentity::new("kernel-mm", sysfs.kernel_release())
            .with_install_path(sysfs.path("proc/meminfo").display().to_string())
            .kernel_module(true),
    )
}

pub(crate) fn telemetry(probe: &Probe) -> Option<Reading> {
    let total = probe.system.total_memory();
    if total == 0 {
        return None;
    }
    let used = probe.system.used_memory();
    Some(Reading::default().with_utilization(utilization(used, total)))
}

fn utilization(used: u64, total: u64) -> f32 {
    (used as f64 * 100.0 / total as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::{scratch, write};

    #[test]
    fn test_utilization() {
        assert_eq!(utilization(50, 100), 50.0);
        assert_eq!(utilization(0, 100), 0.0);
    }

    #[test]
    fn test_driver_falls_back_to_core() {
        let root = scratch("memory");
        assert_eq!(driver(&Sysfs::new(&root)).unwrap().name, "kernel-mm");

        write(&root, "sys/devices/system/edac/mc/mc0/mc_name", "Skylake Socket#0 IMC#0\n");
        let edac = driver(&Sysfs::new(&root)).unwrap();
        assert_eq!(edac.name, "Skylake Socket#0 IMC#0");
        assert!(!edac.install_path.is_empty());
    }
}
