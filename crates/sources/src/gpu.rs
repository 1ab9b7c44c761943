//! GPUs via DRM sysfs, with NVML telemetry for NVIDIA cards
//!
//! Every vendor is discovered through `/sys/class/drm/cardN/device`. AMD and
//! Intel telemetry comes from hwmon; NVIDIA telemetry needs the `nvidia`
//! feature and a working NVML.

use crate::sysfs::Sysfs;
use hwmgr_types::{ComponentKind, DiscoveredDevice, DriverIdentity, GpuInfo, HardwareComponent, Identity, Payload, Reading};

const DRM: &str = "sys/class/drm";

/// PCI vendor of a graphics card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Unknown,
}

impl GpuVendor {
    pub fn from_pci(vendor_id: u32) -> Self {
        match vendor_id {
            0x10de => GpuVendor::Nvidia,
            0x1002 => GpuVendor::Amd,
            0x8086 => GpuVendor::Intel,
            _ => GpuVendor::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GpuVendor::Nvidia => "NVIDIA",
            GpuVendor::Amd => "AMD",
            GpuVendor::Intel => "Intel",
            GpuVendor::Unknown => "Unknown",
        }
    }
}

/// `card0`, `card1`, ... but not connector entries like `card0-DP-1`
fn is_card(entry: &str) -> bool {
    entry
        .strip_prefix("card")
        .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
}

pub(crate) fn discover(sysfs: &Sysfs) -> Vec<DiscoveredDevice> {
    let Ok(entries) = sysfs.list(DRM) else {
        return Vec::new();
    };

    let mut devices = Vec::new();
    for card in entries.into_iter().filter(|e| is_card(e)) {
        let device = format!("{}/{}/device", DRM, card);
        let Ok(vendor_id) = sysfs.read_hex(&format!("{}/vendor", device)) else {
            continue;
        };
        let vendor = GpuVendor::from_pci(vendor_id);
        let device_id = sysfs.read_hex(&format!("{}/device", device)).unwrap_or(0);
        let pci_bus_id = sysfs.link_name(&device).unwrap_or_default();

        let mut info = GpuInfo {
            // amdgpu exposes VRAM size directly
            vram_bytes: sysfs
                .read_int(&format!("{}/mem_info_vram_total", device))
                .map(|bytes| bytes.max(0) as u64)
                .unwrap_or(0),
            pci_bus_id: pci_bus_id.clone(),
            ..GpuInfo::default()
        };
        let mut name = format!("{} GPU {:04x}", vendor.as_str(), device_id);
        if vendor == GpuVendor::Nvidia {
            if let Some(details) = nvml::describe(&pci_bus_id) {
                name = details.name;
                info.vram_bytes = details.vram_bytes;
                info.core_clock_mhz = details.core_clock_mhz;
                info.memory_clock_mhz = details.memory_clock_mhz;
            }
        }

        log::debug!("GPU {}: {} at {}", card, name, pci_bus_id);
        let identity = Identity::new(name)
            .with_vendor(vendor.as_str())
            .with_model(format!("{:04x}:{:04x}", vendor_id, device_id))
            .with_address(card.as_str())
            .with_capacity(info.vram_bytes);
        devices.push(DiscoveredDevice::new(ComponentKind::Gpu, identity, Payload::Gpu(info)));
    }
    devices
}

pub(crate) fn driver(sysfs: &Sysfs, card: &str) -> Option<DriverIdentity> {
    sysfs.device_driver(&format!("{}/{}/device", DRM, card))
}

pub(crate) fn telemetry(sysfs: &Sysfs, component: &HardwareComponent) -> Option<Reading> {
    if let Payload::Gpu(info) = component.payload.as_ref() {
        if component.identity.vendor == GpuVendor::Nvidia.as_str() {
            return nvml::reading(&info.pci_bus_id);
        }
    }
    hwmon_reading(sysfs, &component.identity.bus_address)
}

/// Temperature, busy percentage and power from the card's hwmon directory
fn hwmon_reading(sysfs: &Sysfs, card: &str) -> Option<Reading> {
    let device = format!("{}/{}/device", DRM, card);
    let hwmon = sysfs
        .list(&format!("{}/hwmon", device))
        .ok()
        .and_then(|entries| entries.into_iter().find(|e| e.starts_with("hwmon")))
        .map(|entry| format!("{}/hwmon/{}", device, entry));

    let mut reading = Reading::default();
    if let Some(hwmon) = &hwmon {
        // Millidegrees Celsius
        reading.temperature = ["temp1_input", "temp2_input"]
            .iter()
            .find_map(|file| sysfs.read_int(&format!("{}/{}", hwmon, file)).ok())
            .map(|milli| milli as f32 / 1000.0);
        // Microwatts
        reading.power_usage = ["power1_average", "power1_input"]
            .iter()
            .find_map(|file| sysfs.read_int(&format!("{}/{}", hwmon, file)).ok())
            .map(|uw| uw as f32 / 1_000_000.0);
    }
    reading.utilization = sysfs
        .read_int(&format!("{}/gpu_busy_percent", device))
        .ok()
        .map(|percent| percent as f32);

    if reading == Reading::default() {
        None
    } else {
        Some(reading)
    }
}

#[cfg(feature = "nvidia")]
mod nvml {
    use hwmgr_types::Reading;
    use nvml_wrapper::enum_wrappers::device::{Clock, TemperatureSensor};
    use nvml_wrapper::Nvml;
    use once_cell::sync::Lazy;

    static NVML: Lazy<Option<Nvml>> = Lazy::new(|| match Nvml::init() {
        Ok(nvml) => {
            log::info!("NVML initialized");
            Some(nvml)
        }
        Err(e) => {
            log::info!("NVML: Not available ({})", e);
            None
        }
    });

    pub struct Details {
        pub name: String,
        pub vram_bytes: u64,
        pub core_clock_mhz: u32,
        pub memory_clock_mhz: u32,
    }

    pub fn describe(pci_bus_id: &str) -> Option<Details> {
        let nvml = NVML.as_ref()?;
        let device = nvml.device_by_pci_bus_id(pci_bus_id).ok()?;
        Some(Details {
            name: device.name().unwrap_or_else(|_| "NVIDIA GPU".to_string()),
            vram_bytes: device.memory_info().map(|m| m.total).unwrap_or(0),
            core_clock_mhz: device.max_clock_info(Clock::Graphics).unwrap_or(0),
            memory_clock_mhz: device.max_clock_info(Clock::Memory).unwrap_or(0),
        })
    }

    pub fn reading(pci_bus_id: &str) -> Option<Reading> {
        let nvml = NVML.as_ref()?;
        let device = nvml.device_by_pci_bus_id(pci_bus_id).ok()?;
        Some(Reading {
            temperature: device.temperature(TemperatureSensor::Gpu).ok().map(|t| t as f32),
            utilization: device.utilization_rates().ok().map(|u| u.gpu as f32),
            // mW to W
            power_usage: device.power_usage().ok().map(|p| p as f32 / 1000.0),
            ..Reading::default()
        })
    }
}

#[cfg(not(feature = "nvidia"))]
mod nvml {
    use hwmgr_types::Reading;

    #[allow(dead_code)]
    pub struct Details {
        pub name: String,
        pub vram_bytes: u64,
        pub core_clock_mhz: u32,
        pub memory_clock_mhz: u32,
    }

    pub fn describe(_pci_bus_id: &str) -> Option<Details> {
        None
    }

    pub fn reading(_pci_bus_id: &str) -> Option<Reading> {
        log::trace!("NVML: NVIDIA support not compiled in");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::{scratch, write};

    #[test]
    fn test_card_entries() {
        assert!(is_card("card0"));
        assert!(is_card("card12"));
        assert!(!is_card("card0-DP-1"));
        assert!(!is_card("renderD128"));
        assert!(!is_card("card"));
    }

    #[test]
    fn test_amd_card_discovery_and_hwmon() {
        let root = scratch("gpu");
        write(&root, "sys/class/drm/card0/device/vendor", "0x1002\n");
        write(&root, "sys/class/drm/card0/device/device", "0x73bf\n");
        write(&root, "sys/class/drm/card0/device/mem_info_vram_total", "17163091968\n");
        write(&root, "sys/class/drm/card0/device/gpu_busy_percent", "37\n");
        write(&root, "sys/class/drm/card0/device/hwmon/hwmon3/temp1_input", "52000\n");
        write(&root, "sys/class/drm/card0-DP-1/status", "connected\n");
        let sysfs = Sysfs::new(&root);

        let devices = discover(&sysfs);
        assert_eq!(devices.len(), 1);
        let gpu = &devices[0];
        assert_eq!(gpu.identity.vendor, "AMD");
        assert_eq!(gpu.identity.bus_address, "card0");
        assert_eq!(gpu.identity.capacity, 17163091968);

        let component = HardwareComponent::new(1, gpu.kind, gpu.identity.clone(), gpu.payload.clone());
        let reading = telemetry(&sysfs, &component).unwrap();
        assert_eq!(reading.temperature, Some(52.0));
        assert_eq!(reading.utilization, Some(37.0));
        assert_eq!(reading.power_usage, None);
    }
}
