//! hwmgr-core: Registry, driver lifecycle, monitors and health reporting.
//!
//! This crate contains the [`HardwareManager`] context and the subsystems it
//! owns, plus the [`DetectionSource`] trait through which hardware is
//! discovered and measured.

mod detection;
mod driver;
mod id_alloc;
mod manager;
mod monitor;
mod registry;
mod reporter;
mod sampler;

pub use detection::{DetectionSource, ScriptedDetection, SharedDetectionSource};
pub use driver::{LoadOutcome, UnloadOutcome, UpdateOutcome};
pub use id_alloc::IdAllocator;
pub use manager::{HardwareManager, ScanSummary};
pub use monitor::{effective_interval, MonitorInfo, MonitorObserver, MonitorTarget, MIN_MONITOR_INTERVAL};
pub use registry::{ComponentRegistry, RegistryState};
pub use reporter::{EventReporter, EVENT_LOG_CAPACITY, MAX_HEALTH, MIN_HEALTH};
pub use sampler::{Direction, StatusSampler, Threshold, ThresholdPolicy};

// Re-export the data types used in public signatures for convenience
pub use hwmgr_types::*;
