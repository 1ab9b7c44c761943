//! Kind-specific component details
//!
//! Every component owns exactly one [`Payload`]. Snapshots handed out by the
//! registry share it read-only through an `Arc`, so a snapshot can outlive the
//! removal of its component without ever observing freed data.

use crate::kind::ComponentKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub cores: u32,
    pub threads: u32,
    pub base_frequency_mhz: u64,
    pub architecture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub vram_bytes: u64,
    pub core_clock_mhz: u32,
    pub memory_clock_mhz: u32,
    pub pci_bus_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub swap_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub mount_point: String,
    pub file_system: String,
    /// "SSD", "HDD" or "Unknown"
    pub media: String,
    pub removable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub interface: String,
    pub mac_address: String,
    pub link_speed_mbps: u32,
    pub wireless: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub channels: u32,
    pub sample_rate_hz: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsbInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usb_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BluetoothInfo {
    pub address: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub width: u32,
    pub height: u32,
    pub refresh_hz: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputInfo {
    /// e.g. "keyboard", "mouse", "touchpad"
    pub device_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryInfo {
    pub design_capacity_wh: f32,
    pub charging: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub label: String,
    pub unit: String,
    /// Hardware-reported critical value, if the chip exposes one
    pub critical: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub color: bool,
    pub duplex: bool,
}

/// Closed set of kind-specific details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// No extra detail (always accepted, whatever the component kind)
    #[default]
    None,
    Cpu(CpuInfo),
    Gpu(GpuInfo),
    Memory(MemoryInfo),
    Storage(StorageInfo),
    Network(NetworkInfo),
    Audio(AudioInfo),
    Usb(UsbInfo),
    Bluetooth(BluetoothInfo),
    Display(DisplayInfo),
    Input(InputInfo),
    Battery(BatteryInfo),
    Sensor(SensorInfo),
    Camera(CameraInfo),
    Printer(PrinterInfo),
}

impl Payload {
    /// The component kind this payload describes, `None` for [`Payload::None`]
    pub fn kind(&self) -> Option<ComponentKind> {
        let kind = match self {
            Payload::None => return None,
            Payload::Cpu(_) => ComponentKind::Cpu,
            Payload::Gpu(_) => ComponentKind::Gpu,
            Payload::Memory(_) => ComponentKind::Memory,
            Payload::Storage(_) => ComponentKind::Storage,
            Payload::Network(_) => ComponentKind::Network,
            Payload::Audio(_) => ComponentKind::Audio,
            Payload::Usb(_) => ComponentKind::Usb,
            Payload::Bluetooth(_) => ComponentKind::Bluetooth,
            Payload::Display(_) => ComponentKind::Display,
            Payload::Input(_) => ComponentKind::Input,
            Payload::Battery(_) => ComponentKind::Battery,
            Payload::Sensor(_) => ComponentKind::Sensor,
            Payload::Camera(_) => ComponentKind::Camera,
            Payload::Printer(_) => ComponentKind::Printer,
        };
        Some(kind)
    }

    /// Whether this payload may be attached to a component of `kind`
    pub fn fits(&self, kind: ComponentKind) -> bool {
        self.kind().map_or(true, |own| own == kind)
    }
}
