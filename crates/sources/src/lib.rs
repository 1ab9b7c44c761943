//! hwmgr-sources: Detection sources for the hwmgr hardware manager.
//!
//! [`SysinfoSource`] discovers the local machine's hardware through sysinfo
//! and sysfs. [`SyntheticTelemetry`] wraps any source with random-walk
//! telemetry for demonstrations.

mod catalog;
mod cpu;
mod disk;
mod gpu;
mod memory;
mod network;
mod power;
mod probe;
mod source;
mod synthetic;
mod sysfs;
mod thermal;

pub use catalog::{compare_versions, Catalog};
pub use gpu::GpuVendor;
pub use source::{SysinfoSource, SUPPORTED_KINDS};
pub use synthetic::SyntheticTelemetry;
pub use sysfs::Sysfs;

/// Initialize the shared sysinfo probe (call once at startup)
///
/// Discovery is otherwise done lazily on the first scan.
pub fn initialize_probe() {
    probe::sample(|_| ());
}
