//! Mounted storage

use crate::probe::Probe;
use crate::sysfs::Sysfs;
use hwmgr_types::{
    ComponentKind, DiscoveredDevice, DriverIdentity, HardwareComponent, Identity, Payload, Reading,
    StorageInfo,
};
use sysinfo::DiskKind;

/// File systems that do not correspond to a block device
const VIRTUAL_FS: &[&str] = &["tmpfs", "devtmpfs", "overlay", "squashfs", "proc", "sysfs", "efivarfs"];

pub(crate) fn discover(probe: &Probe) -> Vec<DiscoveredDevice> {
    let mut devices = Vec::new();
    for disk in probe.disks.list() {
        let file_system = disk.file_system().to_string_lossy().to_string();
        if VIRTUAL_FS.contains(&file_system.as_str()) {
            continue;
        }
        let name = disk.name().to_string_lossy().to_string();
        let media = match disk.kind() {
            DiskKind::SSD => "SSD",
            DiskKind::HDD => "HDD",
            DiskKind::Unknown(_) => "Unknown",
        };
        let info = StorageInfo {
            mount_point: disk.mount_point().display().to_string(),
            file_system,
            media: media.to_string(),
            removable: disk.is_removable(),
        };
        let identity = Identity::new(name.clone())
            .with_address(block_name(&name))
            .with_capacity(disk.total_space());
        devices.push(DiscoveredDevice::new(ComponentKind::Storage, identity, Payload::Storage(info)));
    }
    devices
}

/// "/dev/nvme0n1p2" -> "nvme0n1p2"
fn block_name(device: &str) -> String {
    device.rsplit('/').next().unwrap_or(device).to_string()
}

/// Whole-disk name of a partition: "nvme0n1p2" -> "nvme0n1", "sda1" -> "sda"
pub(crate) fn parent_block(partition: &str) -> &str {
    let trimmed = partition.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.len() == partition.len() {
        return partition;
    }
    // nvme0n1p2 and mmcblk0p1 separate the partition number with 'p'
    if let Some(base) = trimmed.strip_suffix('p') {
        if base.ends_with(|c: char| c.is_ascii_digit()) {
            return base;
        }
    }
    // Whole nvme/mmc disks end in a digit themselves
    if trimmed.starts_with("nvme") || trimmed.starts_with("mmcblk") {
        return partition;
    }
    trimmed
}

pub(crate) fn driver(sysfs: &Sysfs, block: &str) -> Option<DriverIdentity> {
    let disk = parent_block(block);
    let mut identity = sysfs.device_driver(&format!("sys/class/block/{}", disk))?;
    identity.supports_hotplug = sysfs
        .read(&format!("sys/class/block/{}/removable", disk))
        .map(|flag| flag == "1")
        .unwrap_or(false);
    Some(identity)
}

pub(crate) fn telemetry(probe: &Probe, component: &HardwareComponent) -> Option<Reading> {
    let Payload::Storage(info) = component.payload.as_ref() else {
        return None;
    };
    let disk = probe
        .disks
        .list()
        .iter()
        .find(|d| d.mount_point().display().to_string() == info.mount_point)?;
    let mut reading = Reading::default().with_free_bytes(disk.available_space());
    if component.identity.bus_address.starts_with("nvme") {
        reading.temperature = probe.temperature_matching(&["nvme Composite", "nvme"]);
    }
    Some(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::{scratch, write};

    #[test]
    fn test_block_name() {
        assert_eq!(block_name("/dev/nvme0n1p2"), "nvme0n1p2");
        assert_eq!(block_name("sda"), "sda");
    }

    #[test]
    fn test_parent_block() {
        assert_eq!(parent_block("nvme0n1p2"), "nvme0n1");
        assert_eq!(parent_block("nvme0n1"), "nvme0n1");
        assert_eq!(parent_block("mmcblk0p1"), "mmcblk0");
        assert_eq!(parent_block("mmcblk0"), "mmcblk0");
        assert_eq!(parent_block("sda1"), "sda");
        assert_eq!(parent_block("sdb"), "sdb");
        assert_eq!(parent_block("vda12"), "vda");
    }

    #[cfg(unix)]
    #[test]
    fn test_removable_disk_supports_hotplug() {
        let root = scratch("disk");
        std::fs::create_dir_all(root.join("sys/bus/usb/drivers/usb-storage")).unwrap();
        std::fs::create_dir_all(root.join("sys/class/block/sdb/device")).unwrap();
        std::os::unix::fs::symlink(
            root.join("sys/bus/usb/drivers/usb-storage"),
            root.join("sys/class/block/sdb/device/driver"),
        )
        .unwrap();
        write(&root, "sys/class/block/sdb/removable", "1\n");

        let driver = driver(&Sysfs::new(&root), "sdb1").unwrap();
        assert_eq!(driver.name, "usb-storage");
        assert!(driver.supports_hotplug);
    }
}
