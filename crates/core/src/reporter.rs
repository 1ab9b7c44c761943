//! Event log and system health gauge
//!
//! The reporter owns the "status lock". When a caller also needs the registry
//! lock it must take that one first.

use hwmgr_types::{
    ComponentId, EventType, HardwareEvent, HwError, HwResult, Severity, SystemHealth,
};
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Health never drops below this floor
pub const MIN_HEALTH: u8 = 10;

/// Starting (and reset) health value
pub const MAX_HEALTH: u8 = 100;

/// Maximum number of events kept; older ones are dropped first
pub const EVENT_LOG_CAPACITY: usize = 1024;

struct ReporterState {
    health: u8,
    total_errors: u64,
    driver_count: usize,
    events: VecDeque<HardwareEvent>,
    events_logged: u64,
    events_dropped: u64,
}

impl ReporterState {
    fn new() -> Self {
        Self {
            health: MAX_HEALTH,
            total_errors: 0,
            driver_count: 0,
            events: VecDeque::with_capacity(64),
            events_logged: 0,
            events_dropped: 0,
        }
    }
}

/// Aggregates severity-weighted events into the system health gauge
pub struct EventReporter {
    state: Mutex<ReporterState>,
}

impl EventReporter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReporterState::new()),
        }
    }

    fn lock(&self) -> HwResult<MutexGuard<'_, ReporterState>> {
        self.state.lock().map_err(|_| HwError::Mutex)
    }

    /// Append an event and apply its health penalty
    ///
    /// Does not check that `component_id` exists; callers holding the
    /// registry lock do that before calling in.
    pub fn record(
        &self,
        component_id: ComponentId,
        event_type: EventType,
        severity: Severity,
        message: impl Into<String>,
    ) -> HwResult<()> {
        let event = HardwareEvent::new(component_id, event_type, severity, message);
        let mut state = self.lock()?;

        if severity.is_severe() {
            let penalty = severity.level().saturating_mul(5);
            state.health = state.health.saturating_sub(penalty).max(MIN_HEALTH);
            state.total_errors += 1;
            warn!(
                "[{}] component {}: {} (health now {})",
                severity, component_id, event.message, state.health
            );
        } else {
            debug!("[{}] component {}: {}", severity, component_id, event.message);
        }

        if state.events.len() >= EVENT_LOG_CAPACITY {
            state.events.pop_front();
            state.events_dropped += 1;
        }
        state.events.push_back(event);
        state.events_logged += 1;
        Ok(())
    }

    pub fn health(&self) -> HwResult<SystemHealth> {
        let state = self.lock()?;
        Ok(SystemHealth {
            health: state.health,
            total_errors: state.total_errors,
            driver_count: state.driver_count,
            events_logged: state.events_logged,
            events_dropped: state.events_dropped,
        })
    }

    /// Up to `max` most recent events, oldest first
    pub fn recent_events(&self, max: usize) -> HwResult<Vec<HardwareEvent>> {
        let state = self.lock()?;
        let skip = state.events.len().saturating_sub(max);
        Ok(state.events.iter().skip(skip).cloned().collect())
    }

    /// Restore health to 100. The error counter is left untouched.
    pub fn reset_health(&self) -> HwResult<()> {
        self.lock()?.health = MAX_HEALTH;
        Ok(())
    }

    /// Track a driver entering (`true`) or leaving (`false`) the loaded set
    pub(crate) fn driver_loaded(&self, loaded: bool) -> HwResult<()> {
        let mut state = self.lock()?;
        if loaded {
            state.driver_count += 1;
        } else if state.driver_count == 0 {
            warn!("driver_count underflow ignored");
        } else {
            state.driver_count -= 1;
        }
        Ok(())
    }

    /// Poison the status lock so every later call fails with `Mutex`
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.state.lock();
            panic!("status lock poisoned on purpose");
        }));
    }
}

impl Default for EventReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_reporter() {
        let reporter = EventReporter::new();
        let health = reporter.health().unwrap();
        assert_eq!(health.health, 100);
        assert_eq!(health.total_errors, 0);
        assert_eq!(health.driver_count, 0);
    }

    #[test]
    fn test_critical_events_floor_health() {
        let reporter = EventReporter::new();
        reporter
            .record(0, EventType::Custom("test".into()), Severity::Critical, "first")
            .unwrap();
        let health = reporter.health().unwrap();
        assert_eq!(health.health, 80);
        assert_eq!(health.total_errors, 1);

        for _ in 0..5 {
            reporter
                .record(0, EventType::Custom("test".into()), Severity::Critical, "again")
                .unwrap();
        }
        let health = reporter.health().unwrap();
        assert_eq!(health.health, MIN_HEALTH);
        assert_eq!(health.total_errors, 6);
    }

    #[test]
    fn test_minor_events_do_not_touch_health() {
        let reporter = EventReporter::new();
        reporter.record(0, EventType::DeviceAdded, Severity::Warning, "meh").unwrap();
        reporter.record(0, EventType::DeviceAdded, Severity::Info, "fine").unwrap();
        let health = reporter.health().unwrap();
        assert_eq!(health.health, 100);
        assert_eq!(health.total_errors, 0);
        assert_eq!(health.events_logged, 2);
    }

    #[test]
    fn test_error_severity_penalty() {
        let reporter = EventReporter::new();
        reporter.record(0, EventType::StatusChanged, Severity::Error, "fault").unwrap();
        assert_eq!(reporter.health().unwrap().health, 85);
    }

    #[test]
    fn test_event_log_is_bounded() {
        let reporter = EventReporter::new();
        for i in 0..EVENT_LOG_CAPACITY + 5 {
            reporter
                .record(0, EventType::DeviceAdded, Severity::Info, format!("event {}", i))
                .unwrap();
        }
        let health = reporter.health().unwrap();
        assert_eq!(health.events_dropped, 5);

        let events = reporter.recent_events(2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].message, format!("event {}", EVENT_LOG_CAPACITY + 4));
    }

    #[test]
    fn test_reset_health_keeps_error_count() {
        let reporter = EventReporter::new();
        reporter.record(0, EventType::StatusChanged, Severity::Critical, "x").unwrap();
        reporter.reset_health().unwrap();
        let health = reporter.health().unwrap();
        assert_eq!(health.health, 100);
        assert_eq!(health.total_errors, 1);
    }
}
