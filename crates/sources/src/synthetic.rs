//! Synthetic telemetry for demonstrations
//!
//! Wraps a real detection source and replaces its telemetry with random
//! walks, so thresholds and events can be exercised on a quiet machine.
//! Discovery and driver matching still come from the wrapped source.

use hwmgr_core::DetectionSource;
use hwmgr_types::{
    ComponentId, ComponentKind, DiscoveredDevice, DriverIdentity, DriverRecord, HardwareComponent,
    HwResult, Identity, Reading,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;

/// Range and step of the random walk driving one component's main value
#[derive(Debug, Clone, Copy)]
struct Walk {
    min: f32,
    max: f32,
    step: f32,
}

impl Walk {
    fn for_kind(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Cpu => Walk { min: 35.0, max: 98.0, step: 6.0 },
            ComponentKind::Gpu => Walk { min: 35.0, max: 100.0, step: 6.0 },
            ComponentKind::Memory => Walk { min: 30.0, max: 99.5, step: 5.0 },
            ComponentKind::Storage => Walk { min: 2.0, max: 60.0, step: 3.0 },
            ComponentKind::Battery => Walk { min: 1.0, max: 100.0, step: 4.0 },
            ComponentKind::Sensor => Walk { min: 30.0, max: 105.0, step: 6.0 },
            _ => Walk { min: 25.0, max: 60.0, step: 2.0 },
        }
    }
}

struct SyntheticState {
    rng: StdRng,
    values: HashMap<ComponentId, f32>,
}

impl SyntheticState {
    fn next(&mut self, id: ComponentId, walk: Walk) -> f32 {
        let current = match self.values.get(&id) {
            Some(value) => *value,
            None => self.rng.gen_range(walk.min..walk.max),
        };
        let next = (current + self.rng.gen_range(-walk.step..walk.step)).clamp(walk.min, walk.max);
        self.values.insert(id, next);
        next
    }
}

pub struct SyntheticTelemetry<S> {
    inner: S,
    state: Mutex<SyntheticState>,
}

impl<S: DetectionSource> SyntheticTelemetry<S> {
    pub fn new(inner: S) -> Self {
        Self::from_rng(inner, StdRng::from_entropy())
    }

    /// Reproducible readings for a given seed
    pub fn with_seed(inner: S, seed: u64) -> Self {
        Self::from_rng(inner, StdRng::seed_from_u64(seed))
    }

    fn from_rng(inner: S, rng: StdRng) -> Self {
        Self {
            inner,
            state: Mutex::new(SyntheticState {
                rng,
                values: HashMap::new(),
            }),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn generate(&self, component: &HardwareComponent) -> Reading {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let walk = Walk::for_kind(component.kind);
        let value = state.next(component.id, walk);

        match component.kind {
            ComponentKind::Cpu | ComponentKind::Gpu => {
                let load = state.rng.gen_range(0.0..100.0);
                Reading::temperature(value)
                    .with_utilization(load)
                    .with_power(load * 1.5)
            }
            ComponentKind::Memory => Reading::default().with_utilization(value),
            ComponentKind::Storage => {
                let capacity = component.identity.capacity;
                Reading::default().with_free_bytes((capacity as f64 * value as f64 / 100.0) as u64)
            }
            ComponentKind::Network => Reading::default().with_link(state.rng.gen_bool(0.9)),
            ComponentKind::Battery => Reading::default().with_charge(value),
            _ => Reading::temperature(value),
        }
    }
}

impl<S: DetectionSource> DetectionSource for SyntheticTelemetry<S> {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn scan(&self) -> HwResult<Vec<DiscoveredDevice>> {
        self.inner.scan()
    }

    fn match_driver(&self, kind: ComponentKind, identity: &Identity) -> Option<DriverIdentity> {
        self.inner.match_driver(kind, identity)
    }

    fn check_update(&self, driver: &DriverRecord, repo_url: Option<&str>) -> HwResult<Option<String>> {
        self.inner.check_update(driver, repo_url)
    }

    fn read_telemetry(&self, component: &HardwareComponent) -> Option<Reading> {
        Some(self.generate(component))
    }
}
