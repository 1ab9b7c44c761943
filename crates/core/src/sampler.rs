//! Telemetry sampling and threshold evaluation

use crate::driver::DriverLifecycle;
use chrono::Utc;
use hwmgr_types::{
    ComponentKind, DeviceStatus, DriverState, EventType, HardwareComponent, HwResult, Reading,
    Severity,
};
use log::{debug, info};
use std::collections::HashMap;
use std::time::Duration;

/// Which side of the limit is bad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

/// Warning and optional critical limit for one measured quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub warning: f64,
    pub critical: Option<f64>,
    pub direction: Direction,
}

impl Threshold {
    pub fn above(warning: f64, critical: Option<f64>) -> Self {
        Self { warning, critical, direction: Direction::Above }
    }

    pub fn below(warning: f64, critical: Option<f64>) -> Self {
        Self { warning, critical, direction: Direction::Below }
    }

    fn exceeded(&self, value: f64, limit: f64) -> bool {
        match self.direction {
            Direction::Above => value > limit,
            Direction::Below => value < limit,
        }
    }

    pub fn evaluate(&self, value: f64) -> DeviceStatus {
        if self.critical.is_some_and(|limit| self.exceeded(value, limit)) {
            DeviceStatus::Critical
        } else if self.exceeded(value, self.warning) {
            DeviceStatus::Warning
        } else {
            DeviceStatus::Ok
        }
    }
}

/// Thresholds applied to one component kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdPolicy {
    /// Degrees Celsius
    pub temperature: Option<Threshold>,
    /// Percent
    pub utilization: Option<Threshold>,
    /// Watts
    pub power: Option<Threshold>,
    /// Free space as a percentage of the component's capacity
    pub free_ratio: Option<Threshold>,
    /// Battery charge in percent
    pub charge: Option<Threshold>,
    /// A down link is a warning
    pub require_link: bool,
}

impl ThresholdPolicy {
    /// Built-in policy for `kind`; kinds without limits get an empty policy
    pub fn for_kind(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Cpu => Self {
                temperature: Some(Threshold::above(80.0, Some(90.0))),
                ..Self::default()
            },
            ComponentKind::Gpu => Self {
                temperature: Some(Threshold::above(85.0, Some(95.0))),
                ..Self::default()
            },
            ComponentKind::Storage => Self {
                temperature: Some(Threshold::above(60.0, Some(70.0))),
                free_ratio: Some(Threshold::below(10.0, None)),
                ..Self::default()
            },
            ComponentKind::Network => Self {
                require_link: true,
                ..Self::default()
            },
            ComponentKind::Memory => Self {
                utilization: Some(Threshold::above(90.0, Some(98.0))),
                ..Self::default()
            },
            ComponentKind::Battery => Self {
                charge: Some(Threshold::below(15.0, Some(5.0))),
                ..Self::default()
            },
            ComponentKind::Sensor => Self {
                temperature: Some(Threshold::above(85.0, Some(100.0))),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// Worst status implied by `reading`, with the quantity that caused it
    fn evaluate(&self, reading: &Reading, capacity: u64) -> (DeviceStatus, Option<String>) {
        let mut worst = DeviceStatus::Ok;
        let mut cause = None;
        let mut consider = |status: DeviceStatus, what: String| {
            if status.rank() > worst.rank() {
                worst = status;
                cause = Some(what);
            }
        };

        if let (Some(limit), Some(value)) = (&self.temperature, reading.temperature) {
            consider(limit.evaluate(value as f64), format!("temperature {:.1} C", value));
        }
        if let (Some(limit), Some(value)) = (&self.utilization, reading.utilization) {
            consider(limit.evaluate(value as f64), format!("utilization {:.1}%", value));
        }
        if let (Some(limit), Some(value)) = (&self.power, reading.power_usage) {
            consider(limit.evaluate(value as f64), format!("power {:.1} W", value));
        }
        if let (Some(limit), Some(free)) = (&self.free_ratio, reading.free_bytes) {
            if capacity > 0 {
                let percent = free as f64 * 100.0 / capacity as f64;
                consider(limit.evaluate(percent), format!("free space {:.1}%", percent));
            }
        }
        if let (Some(limit), Some(value)) = (&self.charge, reading.charge_percent) {
            consider(limit.evaluate(value as f64), format!("charge {:.0}%", value));
        }
        if self.require_link && reading.link_up == Some(false) {
            consider(DeviceStatus::Warning, "link down".to_string());
        }
        (worst, cause)
    }
}

/// Derives component status from telemetry readings
#[derive(Debug, Clone, Default)]
pub struct StatusSampler {
    overrides: HashMap<ComponentKind, ThresholdPolicy>,
}

impl StatusSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in policy for `kind`
    pub fn with_policy(mut self, kind: ComponentKind, policy: ThresholdPolicy) -> Self {
        self.overrides.insert(kind, policy);
        self
    }

    pub fn policy(&self, kind: ComponentKind) -> ThresholdPolicy {
        self.overrides
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ThresholdPolicy::for_kind(kind))
    }

    /// Apply one reading to `component` and return its new status
    ///
    /// An event is reported only on the edge into Warning, Error or Critical;
    /// a status that stays degraded across samples is reported once.
    pub(crate) fn sample(
        &self,
        component: &mut HardwareComponent,
        reading: Option<Reading>,
        lifecycle: &DriverLifecycle<'_>,
    ) -> HwResult<DeviceStatus> {
        component.status.uptime = uptime(component);

        if component.driver.state == DriverState::Disabled {
            component.status.status = DeviceStatus::Disabled;
            return Ok(DeviceStatus::Disabled);
        }

        let reading = match reading {
            Some(reading) => reading,
            None => return Ok(component.status.status),
        };

        let status = &mut component.status;
        if let Some(value) = reading.temperature {
            status.temperature = value;
        }
        if let Some(value) = reading.utilization {
            status.utilization = value;
        }
        if let Some(value) = reading.power_usage {
            status.power_usage = value;
        }

        let (mut derived, mut cause) =
            self.policy(component.kind).evaluate(&reading, component.identity.capacity);
        if let Some(fault) = &reading.fault {
            derived = DeviceStatus::Error.worst(derived);
            component.status.error_count = component.status.error_count.saturating_add(1);
            component.status.last_error_message = fault.clone();
            cause = Some(fault.clone());
        }

        let previous = component.status.status;
        component.status.status = derived;

        if derived != previous {
            let rank = derived.rank();
            match Severity::from_level(rank).filter(|_| rank >= Severity::Warning.level()) {
                Some(severity) => {
                    let message = format!(
                        "{} '{}' {} -> {}{}",
                        component.kind,
                        component.name(),
                        previous,
                        derived,
                        cause.map(|c| format!(" ({})", c)).unwrap_or_default()
                    );
                    lifecycle.reporter.record(
                        component.id,
                        EventType::StatusChanged,
                        severity,
                        message,
                    )?;
                }
                None => debug!(
                    "Component {} status {} -> {}",
                    component.id, previous, derived
                ),
            }
        }

        if reading.fault.is_none() && component.driver.state == DriverState::Loaded {
            lifecycle.transition(component, DriverState::Active)?;
            info!("Driver '{}' active on component {}", component.driver.name, component.id);
        }

        Ok(derived)
    }
}

fn uptime(component: &HardwareComponent) -> Duration {
    match component.driver.load_time {
        Some(loaded) if component.driver.state.is_loaded() => {
            (Utc::now() - loaded).to_std().unwrap_or_default()
        }
        _ => Duration::ZERO,
    }
}
