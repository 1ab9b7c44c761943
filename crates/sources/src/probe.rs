//! Shared sysinfo state
//!
//! One process-wide set of sysinfo collections, initialized on first use and
//! shared by discovery and telemetry. Refreshes are throttled so several
//! components sampled in the same monitor pass cost one refresh.

use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Components, CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

/// Minimum interval between refreshes (250ms)
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

pub(crate) struct Probe {
    pub system: System,
    pub components: Components,
    pub disks: Disks,
    pub networks: Networks,
    last_refresh: Instant,
}

impl Probe {
    fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            system,
            components: Components::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            last_refresh: Instant::now(),
        }
    }

    /// Refresh values only if enough time has passed since the last refresh
    fn refresh_if_needed(&mut self) {
        if self.last_refresh.elapsed() >= MIN_REFRESH_INTERVAL {
            self.system.refresh_cpu_all();
            self.system.refresh_memory();
            self.components.refresh();
            self.disks.refresh();
            self.networks.refresh();
            self.last_refresh = Instant::now();
        }
    }

    /// Re-enumerate disks, interfaces and sensors
    fn refresh_lists(&mut self) {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.components.refresh_list();
        self.disks.refresh_list();
        self.networks.refresh_list();
        self.last_refresh = Instant::now();
    }

    /// Temperature of the first sensor whose label contains one of `needles`
    pub fn temperature_matching(&self, needles: &[&str]) -> Option<f32> {
        needles.iter().find_map(|needle| {
            self.components
                .list()
                .iter()
                .find(|c| c.label().contains(needle))
                .map(|c| c.temperature())
                .filter(|t| t.is_finite())
        })
    }
}

static SHARED_PROBE: Lazy<Mutex<Probe>> = Lazy::new(|| {
    log::info!("Initializing shared sysinfo probe");
    let probe = Probe::new();
    log::debug!(
        "Probe ready: {} cpu(s), {} disk(s), {} interface(s), {} sensor(s)",
        probe.system.cpus().len(),
        probe.disks.list().len(),
        probe.networks.list().len(),
        probe.components.list().len()
    );
    Mutex::new(probe)
});

fn with_lock<T>(f: impl FnOnce(&mut Probe) -> T) -> T {
    // A poisoned probe still holds usable readings
    let mut probe = SHARED_PROBE.lock().unwrap_or_else(|poisoned| {
        log::warn!("Shared probe mutex was poisoned, recovering");
        poisoned.into_inner()
    });
    f(&mut probe)
}

/// Run `f` against freshly refreshed values
pub(crate) fn sample<T>(f: impl FnOnce(&Probe) -> T) -> T {
    with_lock(|probe| {
        probe.refresh_if_needed();
        f(probe)
    })
}

/// Run `f` after re-enumerating devices
pub(crate) fn rescan<T>(f: impl FnOnce(&Probe) -> T) -> T {
    with_lock(|probe| {
        probe.refresh_lists();
        f(probe)
    })
}
