//! Driver lifecycle state machine
//!
//! All state changes funnel through [`DriverLifecycle::transition`], which is
//! the only place `driver_count` is adjusted. Composite operations such as
//! `update` (unload, bump version, reload) therefore keep the count equal to
//! the number of Loaded/Active drivers without any bookkeeping of their own.

use crate::detection::DetectionSource;
use crate::reporter::EventReporter;
use chrono::Utc;
use hwmgr_types::{
    DeviceStatus, DriverState, EventType, HardwareComponent, HwError, HwResult, ManagerConfig,
    PowerState, Severity,
};
use log::{debug, info, warn};
use serde::Serialize;

/// Result of a load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadOutcome {
    Loaded,
    /// Already Loaded or Active and not forced
    AlreadyLoaded,
}

/// Result of an unload request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnloadOutcome {
    Unloaded,
    /// Nothing was loaded; informational, not a failure
    NotLoaded,
}

/// Result of an update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UpdateOutcome {
    UpToDate,
    /// A newer version exists (check-only requests)
    Available { current: String, latest: String },
    Updated { previous: String, current: String },
}

/// Driver operations bound to the collaborators they need
///
/// Constructed per call while the registry lock is held.
pub(crate) struct DriverLifecycle<'a> {
    pub reporter: &'a EventReporter,
    pub source: &'a dyn DetectionSource,
    pub config: &'a ManagerConfig,
}

impl DriverLifecycle<'_> {
    /// Move the driver to `next`, adjusting `driver_count` on loaded-set changes
    pub fn transition(&self, component: &mut HardwareComponent, next: DriverState) -> HwResult<()> {
        let previous = component.driver.state;
        if previous == next {
            return Ok(());
        }
        if previous.is_loaded() != next.is_loaded() {
            self.reporter.driver_loaded(next.is_loaded())?;
        }
        component.driver.state = next;
        debug!(
            "Driver '{}' of component {}: {} -> {}",
            component.driver.name, component.id, previous, next
        );
        Ok(())
    }

    /// Match the component to a driver. Never fails.
    pub fn detect(&self, component: &mut HardwareComponent) {
        let next = match self.source.match_driver(component.kind, &component.identity) {
            Some(identity) => {
                component.driver.apply_identity(&identity);
                if identity.outdated {
                    DriverState::Outdated
                } else {
                    DriverState::Installed
                }
            }
            None => DriverState::Missing,
        };
        if let Err(e) = self.transition(component, next) {
            warn!("Driver detection for component {} not recorded: {}", component.id, e);
        }
    }

    /// Refuse drivers without a known install path while security checks are on
    fn verify_install_path(&self, component: &HardwareComponent) -> HwResult<()> {
        if self.config.security_checks && component.driver.install_path.is_empty() {
            return Err(HwError::Access(format!(
                "driver '{}' has no verified install path",
                component.driver.name
            )));
        }
        Ok(())
    }

    /// Run a composite operation, restoring driver record and status if it fails
    fn rollback_on_error<T>(
        &self,
        component: &mut HardwareComponent,
        op: impl FnOnce(&mut HardwareComponent) -> HwResult<T>,
    ) -> HwResult<T> {
        let driver = component.driver.clone();
        let status = component.status.clone();
        let result = op(component);
        if result.is_err() {
            // Back through transition so driver_count follows the restored state
            if let Err(e) = self.transition(component, driver.state) {
                warn!("Rollback of component {} left driver_count unadjusted: {}", component.id, e);
            }
            component.driver = driver;
            component.status = status;
        }
        result
    }

    pub fn load(&self, component: &mut HardwareComponent, force: bool) -> HwResult<LoadOutcome> {
        match component.driver.state {
            DriverState::Loaded | DriverState::Active if !force => {
                return Ok(LoadOutcome::AlreadyLoaded);
            }
            DriverState::Installed | DriverState::Outdated | DriverState::Loaded | DriverState::Active => {}
            DriverState::Missing => {
                return Err(HwError::Driver(format!(
                    "no driver available for component {}",
                    component.id
                )));
            }
            state => {
                return Err(HwError::InvalidState(format!(
                    "cannot load driver of component {} from state {}",
                    component.id, state
                )));
            }
        }

        self.verify_install_path(component)?;

        self.transition(component, DriverState::Loaded)?;
        component.driver.load_time = Some(Utc::now());
        if matches!(
            component.status.status,
            DeviceStatus::Unknown | DeviceStatus::Disabled | DeviceStatus::NotPresent
        ) {
            component.status.status = DeviceStatus::Ok;
        }
        component.status.power_state = PowerState::Normal;

        info!(
            "Loaded driver '{}' {} for component {}",
            component.driver.name, component.driver.version, component.id
        );
        self.reporter.record(
            component.id,
            EventType::DriverLoaded,
            Severity::Info,
            format!("driver {} {} loaded", component.driver.name, component.driver.version),
        )?;
        Ok(LoadOutcome::Loaded)
    }

    pub fn unload(&self, component: &mut HardwareComponent) -> HwResult<UnloadOutcome> {
        if !component.driver.state.is_loaded() {
            return Ok(UnloadOutcome::NotLoaded);
        }
        self.transition(component, DriverState::Installed)?;
        info!("Unloaded driver '{}' for component {}", component.driver.name, component.id);
        self.reporter.record(
            component.id,
            EventType::DriverUnloaded,
            Severity::Info,
            format!("driver {} unloaded", component.driver.name),
        )?;
        Ok(UnloadOutcome::Unloaded)
    }

    pub fn update(&self, component: &mut HardwareComponent, check_only: bool) -> HwResult<UpdateOutcome> {
        match component.driver.state {
            DriverState::Missing => {
                return Err(HwError::Driver(format!(
                    "no driver installed for component {}",
                    component.id
                )));
            }
            DriverState::Disabled | DriverState::Unknown => {
                return Err(HwError::InvalidState(format!(
                    "cannot update driver of component {} in state {}",
                    component.id, component.driver.state
                )));
            }
            _ => {}
        }

        let repo = self.config.driver_repo_url.as_deref();
        let latest = match self.source.check_update(&component.driver, repo)? {
            Some(latest) => latest,
            None => return Ok(UpdateOutcome::UpToDate),
        };
        let current = component.driver.version.clone();
        if check_only {
            return Ok(UpdateOutcome::Available { current, latest });
        }

        self.verify_install_path(component)?;
        self.rollback_on_error(component, |component| {
            self.unload(component)?;
            component.driver.version = latest;
            if component.driver.state == DriverState::Error {
                self.transition(component, DriverState::Installed)?;
            }
            self.load(component, true).map(|_| ())
        })?;

        info!(
            "Updated driver '{}' of component {}: {} -> {}",
            component.driver.name, component.id, current, component.driver.version
        );
        self.reporter.record(
            component.id,
            EventType::DriverUpdated,
            Severity::Notice,
            format!("driver {} updated {} -> {}", component.driver.name, current, component.driver.version),
        )?;
        Ok(UpdateOutcome::Updated {
            previous: current,
            current: component.driver.version.clone(),
        })
    }

    pub fn set_enabled(&self, component: &mut HardwareComponent, enabled: bool) -> HwResult<()> {
        if enabled {
            if component.driver.state == DriverState::Disabled && component.driver.name.is_empty() {
                return Err(HwError::Driver(format!(
                    "no driver available for component {}",
                    component.id
                )));
            }
            return self.rollback_on_error(component, |component| {
                if component.driver.state == DriverState::Disabled {
                    self.transition(component, DriverState::Installed)?;
                }
                self.load(component, false).map(|_| ())
            });
        }

        self.unload(component)?;
        self.transition(component, DriverState::Disabled)?;
        component.status.status = DeviceStatus::Disabled;
        component.status.power_state = PowerState::Off;
        self.reporter.record(
            component.id,
            EventType::DriverDisabled,
            Severity::Notice,
            format!("component {} disabled", component.id),
        )?;
        Ok(())
    }

    /// Drop a component's driver out of the loaded set before it is removed
    pub fn release(&self, component: &mut HardwareComponent) -> HwResult<()> {
        if component.driver.state.is_loaded() {
            self.transition(component, DriverState::Installed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ScriptedDetection;
    use hwmgr_types::{ComponentKind, DriverIdentity, Identity, Payload};

    fn component(name: &str) -> HardwareComponent {
        HardwareComponent::new(1, ComponentKind::Network, Identity::new(name), Payload::None)
    }

    fn source() -> ScriptedDetection {
        ScriptedDetection::new()
            .with_driver(
                "eth0",
                DriverIdentity::new("e1000e", "3.8.4")
                    .with_install_path("/lib/modules/e1000e.ko")
                    .kernel_module(true),
            )
            .with_update("e1000e", "3.8.7")
    }

    #[test]
    fn test_detect_installed_or_missing() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut matched = component("eth0");
        lifecycle.detect(&mut matched);
        assert_eq!(matched.driver.state, DriverState::Installed);
        assert_eq!(matched.driver.name, "e1000e");

        let mut unmatched = component("wlan9");
        lifecycle.detect(&mut unmatched);
        assert_eq!(unmatched.driver.state, DriverState::Missing);
    }

    #[test]
    fn test_load_twice_is_a_noop() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        assert_eq!(lifecycle.load(&mut eth, false).unwrap(), LoadOutcome::Loaded);
        assert_eq!(lifecycle.load(&mut eth, false).unwrap(), LoadOutcome::AlreadyLoaded);
        assert_eq!(reporter.health().unwrap().driver_count, 1);

        // Forced reload stays inside the loaded set
        assert_eq!(lifecycle.load(&mut eth, true).unwrap(), LoadOutcome::Loaded);
        assert_eq!(reporter.health().unwrap().driver_count, 1);
        assert!(eth.driver.load_time.is_some());
        assert_eq!(eth.status.status, DeviceStatus::Ok);
    }

    #[test]
    fn test_unload_when_not_loaded_is_informational() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        assert_eq!(lifecycle.unload(&mut eth).unwrap(), UnloadOutcome::NotLoaded);
        lifecycle.load(&mut eth, false).unwrap();
        assert_eq!(lifecycle.unload(&mut eth).unwrap(), UnloadOutcome::Unloaded);
        assert_eq!(eth.driver.state, DriverState::Installed);
        assert_eq!(reporter.health().unwrap().driver_count, 0);
    }

    #[test]
    fn test_load_missing_driver_fails() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut unknown = component("mystery");
        lifecycle.detect(&mut unknown);
        assert!(matches!(lifecycle.load(&mut unknown, false), Err(HwError::Driver(_))));
        assert_eq!(reporter.health().unwrap().driver_count, 0);
    }

    #[test]
    fn test_security_checks_require_install_path() {
        let source = ScriptedDetection::new().with_driver("eth0", DriverIdentity::new("e1000e", "1.0"));
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        assert!(matches!(lifecycle.load(&mut eth, false), Err(HwError::Access(_))));
        assert_eq!(eth.driver.state, DriverState::Installed);

        let relaxed = ManagerConfig {
            security_checks: false,
            ..ManagerConfig::default()
        };
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &relaxed };
        assert_eq!(lifecycle.load(&mut eth, false).unwrap(), LoadOutcome::Loaded);
    }

    #[test]
    fn test_update_keeps_driver_count_exact() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        lifecycle.load(&mut eth, false).unwrap();

        let check = lifecycle.update(&mut eth, true).unwrap();
        assert_eq!(
            check,
            UpdateOutcome::Available {
                current: "3.8.4".to_string(),
                latest: "3.8.7".to_string()
            }
        );
        assert_eq!(eth.driver.version, "3.8.4");

        let done = lifecycle.update(&mut eth, false).unwrap();
        assert!(matches!(done, UpdateOutcome::Updated { .. }));
        assert_eq!(eth.driver.version, "3.8.7");
        assert_eq!(eth.driver.state, DriverState::Loaded);
        assert_eq!(reporter.health().unwrap().driver_count, 1);

        assert_eq!(lifecycle.update(&mut eth, false).unwrap(), UpdateOutcome::UpToDate);
    }

    #[test]
    fn test_update_of_unloaded_driver_loads_it() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        lifecycle.update(&mut eth, false).unwrap();
        assert_eq!(eth.driver.state, DriverState::Loaded);
        assert_eq!(reporter.health().unwrap().driver_count, 1);
    }

    #[test]
    fn test_disable_then_enable_round_trip() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        lifecycle.load(&mut eth, false).unwrap();

        lifecycle.set_enabled(&mut eth, false).unwrap();
        assert_eq!(eth.driver.state, DriverState::Disabled);
        assert_eq!(eth.status.status, DeviceStatus::Disabled);
        assert_eq!(reporter.health().unwrap().driver_count, 0);
        assert!(matches!(lifecycle.load(&mut eth, false), Err(HwError::InvalidState(_))));

        lifecycle.set_enabled(&mut eth, true).unwrap();
        assert_eq!(eth.driver.state, DriverState::Loaded);
        assert_eq!(eth.status.status, DeviceStatus::Ok);
        assert_eq!(eth.status.power_state, PowerState::Normal);
        assert_eq!(reporter.health().unwrap().driver_count, 1);
    }

    #[test]
    fn test_failed_update_leaves_driver_untouched() {
        let source = ScriptedDetection::new()
            .with_driver("eth0", DriverIdentity::new("e1000e", "3.8.4").kernel_module(true))
            .with_update("e1000e", "3.8.7");
        let reporter = EventReporter::new();
        let relaxed = ManagerConfig {
            security_checks: false,
            ..ManagerConfig::default()
        };
        let loader = DriverLifecycle { reporter: &reporter, source: &source, config: &relaxed };

        let mut eth = component("eth0");
        loader.detect(&mut eth);
        loader.load(&mut eth, false).unwrap();
        let loaded_at = eth.driver.load_time;
        let events = reporter.recent_events(usize::MAX).unwrap().len();

        // Built-in drivers have no install path, so a checked reload must refuse
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };
        assert!(matches!(lifecycle.update(&mut eth, false), Err(HwError::Access(_))));
        assert_eq!(eth.driver.version, "3.8.4");
        assert_eq!(eth.driver.state, DriverState::Loaded);
        assert_eq!(eth.driver.load_time, loaded_at);
        assert_eq!(reporter.health().unwrap().driver_count, 1);
        assert_eq!(reporter.recent_events(usize::MAX).unwrap().len(), events);
    }

    #[test]
    fn test_rollback_restores_loaded_set() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        lifecycle.load(&mut eth, false).unwrap();

        let result: HwResult<()> = lifecycle.rollback_on_error(&mut eth, |eth| {
            lifecycle.unload(eth)?;
            eth.driver.version = "9.9.9".to_string();
            Err(HwError::Access("reload refused".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(eth.driver.state, DriverState::Loaded);
        assert_eq!(eth.driver.version, "3.8.4");
        assert_eq!(reporter.health().unwrap().driver_count, 1);
    }

    #[test]
    fn test_enable_without_driver_stays_disabled() {
        let source = source();
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut unknown = component("mystery");
        lifecycle.detect(&mut unknown);
        lifecycle.set_enabled(&mut unknown, false).unwrap();
        assert_eq!(unknown.driver.state, DriverState::Disabled);

        assert!(matches!(lifecycle.set_enabled(&mut unknown, true), Err(HwError::Driver(_))));
        assert_eq!(unknown.driver.state, DriverState::Disabled);
        assert_eq!(unknown.status.status, DeviceStatus::Disabled);
    }

    #[test]
    fn test_enable_with_unverified_driver_stays_disabled() {
        let source = ScriptedDetection::new().with_driver("eth0", DriverIdentity::new("e1000e", "1.0"));
        let reporter = EventReporter::new();
        let config = ManagerConfig::default();
        let lifecycle = DriverLifecycle { reporter: &reporter, source: &source, config: &config };

        let mut eth = component("eth0");
        lifecycle.detect(&mut eth);
        lifecycle.set_enabled(&mut eth, false).unwrap();

        assert!(matches!(lifecycle.set_enabled(&mut eth, true), Err(HwError::Access(_))));
        assert_eq!(eth.driver.state, DriverState::Disabled);
        assert_eq!(eth.status.power_state, PowerState::Off);
        assert_eq!(reporter.health().unwrap().driver_count, 0);
    }
}
