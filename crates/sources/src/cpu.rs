//! CPU discovery and telemetry

use crate::probe::Probe;
use crate::sysfs::Sysfs;
use hwmgr_types::{ComponentKind, CpuInfo, DiscoveredDevice, DriverIdentity, Identity, Payload, Reading};

/// Sensor labels tried in order when looking for the package temperature
const PACKAGE_SENSORS: &[&str] = &["Package id 0", "Tctl", "Tdie", "coretemp", "k10temp", "cpu_thermal"];

pub(crate) fn discover(probe: &Probe, sysfs: &Sysfs) -> Vec<DiscoveredDevice> {
    let cpus = probe.system.cpus();
    let Some(first) = cpus.first() else {
        log::warn!("sysinfo reported no CPUs");
        return Vec::new();
    };

    let brand = first.brand().trim();
    let name = if brand.is_empty() { "CPU".to_string() } else { brand.to_string() };
    // base_frequency is exposed in kHz by intel_pstate; fall back to the current clock
    let base_frequency_mhz = sysfs
        .read_int("sys/devices/system/cpu/cpu0/cpufreq/base_frequency")
        .map(|khz| (khz / 1000) as u64)
        .unwrap_or_else(|_| first.frequency());

    let info = CpuInfo {
        cores: physical_cores(sysfs).unwrap_or(cpus.len() as u32),
        threads: cpus.len() as u32,
        base_frequency_mhz,
        architecture: std::env::consts::ARCH.to_string(),
    };
    let identity = Identity::new(name)
        .with_vendor(first.vendor_id())
        .with_model(brand)
        .with_address("cpu0");

    vec![DiscoveredDevice::new(ComponentKind::Cpu, identity, Payload::Cpu(info))]
}

/// `cpu cores` from /proc/cpuinfo
fn physical_cores(sysfs: &Sysfs) -> Option<u32> {
    let cpuinfo = sysfs.read("proc/cpuinfo").ok()?;
    parse_cpu_cores(&cpuinfo)
}

fn parse_cpu_cores(cpuinfo: &str) -> Option<u32> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("cpu cores"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|value| value.trim().parse().ok())
}

/// The cpufreq scaling driver governs the package
pub(crate) fn driver(sysfs: &Sysfs) -> Option<DriverIdentity> {
    let name = sysfs
        .read("sys/devices/system/cpu/cpufreq/policy0/scaling_driver")
        .or_else(|_| sysfs.read("sys/devices/system/cpu/cpu0/cpufreq/scaling_driver"))
        .ok()?;
    let mut identity = sysfs.module(&name);
    if identity.install_path.is_empty() {
        identity.install_path = sysfs.path("sys/devices/system/cpu/cpufreq").display().to_string();
    }
    Some(identity)
}

pub(crate) fn telemetry(probe: &Probe) -> Option<Reading> {
    let mut reading = Reading::default().with_utilization(probe.system.global_cpu_usage());
    reading.temperature = probe.temperature_matching(PACKAGE_SENSORS);
    Some(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::{scratch, write};

    #[test]
    fn test_parse_cpu_cores() {
        let cpuinfo = "processor\t: 0\nmodel name\t: Test CPU\ncpu cores\t: 8\nsiblings\t: 16\n";
        assert_eq!(parse_cpu_cores(cpuinfo), Some(8));
        assert_eq!(parse_cpu_cores("processor : 0\n"), None);
    }

    #[test]
    fn test_scaling_driver_lookup() {
        let root = scratch("cpu");
        write(&root, "sys/devices/system/cpu/cpufreq/policy0/scaling_driver", "intel_pstate\n");
        write(&root, "proc/sys/kernel/osrelease", "6.8.0\n");
        let driver = driver(&Sysfs::new(&root)).unwrap();
        assert_eq!(driver.name, "intel_pstate");
        assert_eq!(driver.version, "6.8.0");
        assert!(driver.install_path.ends_with("cpufreq"));

        assert!(super::driver(&Sysfs::new(scratch("cpu-empty"))).is_none());
    }
}
