//! hwmgr-types: Shared data types for the hwmgr hardware manager.
//!
//! This crate contains pure data types (component records, driver records,
//! payloads, events, configuration and the error taxonomy) shared across all
//! hwmgr crates. Nothing here locks, spawns or talks to hardware.

pub mod component;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod kind;
pub mod payload;
pub mod telemetry;

// Re-export commonly used types at the crate root for convenience
pub use component::{
    ComponentId, DeviceKey, DiscoveredDevice, HardwareComponent, Identity, MonitorId,
    StatusRecord, ALL_COMPONENTS, ALL_MONITORS,
};
pub use config::ManagerConfig;
pub use driver::{DriverIdentity, DriverRecord, DriverState};
pub use error::{ErrorCode, HwError, HwResult};
pub use event::{EventType, HardwareEvent, Severity, SystemHealth};
pub use kind::{ComponentKind, DeviceStatus, PowerState};
pub use payload::{
    AudioInfo, BatteryInfo, BluetoothInfo, CameraInfo, CpuInfo, DisplayInfo, GpuInfo, InputInfo,
    MemoryInfo, NetworkInfo, Payload, PrinterInfo, SensorInfo, StorageInfo, UsbInfo,
};
pub use telemetry::Reading;
