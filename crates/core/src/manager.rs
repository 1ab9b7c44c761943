//! The hardware manager: one explicit context tying the subsystems together
//!
//! Lock order is registry, then reporter. The monitor table is locked on its
//! own and never while the registry lock is held.

use crate::detection::SharedDetectionSource;
use crate::driver::{DriverLifecycle, LoadOutcome, UnloadOutcome, UpdateOutcome};
use crate::monitor::{effective_interval, MonitorEngine, MonitorInfo, MonitorObserver, MonitorTarget, Poller};
use crate::registry::{ComponentRegistry, RegistryState};
use crate::reporter::EventReporter;
use crate::sampler::StatusSampler;
use arc_swap::ArcSwap;
use hwmgr_types::{
    ComponentId, ComponentKind, DeviceKey, DeviceStatus, DriverState, EventType, HardwareComponent,
    HardwareEvent, HwError, HwResult, Identity, ManagerConfig, MonitorId, Payload, Severity,
    SystemHealth,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub added: Vec<ComponentId>,
    pub removed: Vec<ComponentId>,
    /// Drivers updated automatically
    pub updated: usize,
}

struct Context {
    registry: ComponentRegistry,
    reporter: EventReporter,
    sampler: StatusSampler,
    source: SharedDetectionSource,
    config: ArcSwap<ManagerConfig>,
    initialized: AtomicBool,
}

impl Context {
    fn lifecycle<'a>(&'a self, config: &'a ManagerConfig) -> DriverLifecycle<'a> {
        DriverLifecycle {
            reporter: &self.reporter,
            source: self.source.as_ref(),
            config,
        }
    }

    fn sample(&self, component: &mut HardwareComponent, config: &ManagerConfig) -> HwResult<DeviceStatus> {
        let reading = if component.driver.state == DriverState::Disabled {
            None
        } else {
            self.source.read_telemetry(component)
        };
        self.sampler.sample(component, reading, &self.lifecycle(config))
    }

    /// Insert a component under an already held registry lock
    fn insert(
        &self,
        registry: &mut RegistryState,
        config: &ManagerConfig,
        kind: ComponentKind,
        identity: Identity,
        payload: Payload,
    ) -> HwResult<ComponentId> {
        let component = registry.insert(kind, identity, payload)?;
        self.lifecycle(config).detect(component);
        let id = component.id;
        let message = format!("{} '{}' added", component.kind, component.name());
        info!(
            "Component {}: {} '{}' (driver {})",
            id,
            component.kind,
            component.name(),
            component.driver.state
        );
        if let Err(e) = self.reporter.record(id, EventType::DeviceAdded, Severity::Info, message) {
            // Detection never loads a driver, so dropping the entry is enough
            registry.remove(id)?;
            return Err(e);
        }
        Ok(id)
    }

    /// Remove a component under an already held registry lock
    fn remove(&self, registry: &mut RegistryState, config: &ManagerConfig, id: ComponentId) -> HwResult<()> {
        let component = registry.get_mut(id)?;
        let message = format!("{} '{}' removed", component.kind, component.name());
        self.reporter.record(id, EventType::DeviceRemoved, Severity::Info, message)?;
        self.lifecycle(config).release(component)?;
        let removed = registry.remove(id)?;
        info!("Component {} removed: {} '{}'", id, removed.kind, removed.name());
        Ok(())
    }
}

impl Poller for Context {
    fn poll(&self, target: MonitorTarget, visit: &mut dyn FnMut(&HardwareComponent)) -> HwResult<usize> {
        let config = self.config.load();
        let mut registry = self.registry.lock()?;
        let mut sampled = 0;
        for component in registry.iter_mut() {
            let wanted = match target {
                MonitorTarget::All => true,
                MonitorTarget::Component(id) => component.id == id,
            };
            if !wanted {
                continue;
            }
            if let Err(e) = self.sample(component, &config) {
                warn!("Sampling component {} failed: {}", component.id, e);
                continue;
            }
            let sampled_component: &HardwareComponent = component;
            if panic::catch_unwind(AssertUnwindSafe(|| visit(sampled_component))).is_err() {
                warn!("Monitor observer panicked on component {}", sampled_component.id);
            }
            sampled += 1;
        }
        Ok(sampled)
    }
}

/// Owns the registry, the monitors and the health gauge
///
/// Every operation other than construction fails with `NotInitialized`
/// until [`init`](Self::init) has been called.
pub struct HardwareManager {
    ctx: Arc<Context>,
    monitors: MonitorEngine,
}

impl HardwareManager {
    pub fn new(source: SharedDetectionSource, config: ManagerConfig) -> HwResult<Self> {
        Self::with_sampler(source, config, StatusSampler::new())
    }

    /// Construct with custom threshold policies
    pub fn with_sampler(
        source: SharedDetectionSource,
        config: ManagerConfig,
        sampler: StatusSampler,
    ) -> HwResult<Self> {
        config.validate()?;
        Ok(Self {
            ctx: Arc::new(Context {
                registry: ComponentRegistry::new(),
                reporter: EventReporter::new(),
                sampler,
                source,
                config: ArcSwap::from_pointee(config),
                initialized: AtomicBool::new(false),
            }),
            monitors: MonitorEngine::new(),
        })
    }

    pub fn init(&self) -> HwResult<()> {
        if self.ctx.initialized.swap(true, Ordering::AcqRel) {
            return Err(HwError::AlreadyInit);
        }
        let config = self.ctx.config.load();
        info!(
            "Hardware manager initialized with source '{}' (hotplug: {}, monitoring: {}, security checks: {})",
            self.ctx.source.name(),
            config.enable_hotplug,
            config.enable_monitoring,
            config.security_checks
        );
        if config.enable_ai_optimization {
            info!("AI optimization requested; no optimizer is available, continuing without it");
        }
        Ok(())
    }

    /// Stop all monitors and forget all components
    ///
    /// The manager can be initialized again afterwards. Ids keep counting up.
    pub fn shutdown(&self) -> HwResult<()> {
        self.ensure_init()?;
        self.monitors.stop(0)?;
        let config = self.ctx.config.load();
        let mut registry = self.ctx.registry.lock()?;
        let lifecycle = self.ctx.lifecycle(&config);
        for component in registry.iter_mut() {
            lifecycle.release(component)?;
        }
        let dropped = registry.drain().len();
        drop(registry);
        self.ctx.initialized.store(false, Ordering::Release);
        info!("Hardware manager shut down ({} component(s) released)", dropped);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ctx.initialized.load(Ordering::Acquire)
    }

    fn ensure_init(&self) -> HwResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(HwError::NotInitialized)
        }
    }

    pub fn config(&self) -> Arc<ManagerConfig> {
        self.ctx.config.load_full()
    }

    /// Validate and swap in a new configuration; running monitors keep their interval
    pub fn set_config(&self, config: ManagerConfig) -> HwResult<()> {
        config.validate()?;
        debug!("Configuration replaced: {:?}", config);
        self.ctx.config.store(Arc::new(config));
        Ok(())
    }

    /// Reconcile the registry with what the detection source reports
    pub fn scan(&self) -> HwResult<ScanSummary> {
        self.ensure_init()?;
        let config = self.ctx.config.load();
        let discovered = self.ctx.source.scan()?;

        let mut registry = self.ctx.registry.lock()?;
        let lifecycle = self.ctx.lifecycle(&config);
        let mut known: HashSet<DeviceKey> = registry.iter().map(HardwareComponent::device_key).collect();
        let present: HashSet<DeviceKey> = discovered.iter().map(|d| d.device_key()).collect();

        let fresh: Vec<_> = discovered
            .into_iter()
            .filter(|device| {
                if !device.payload.fits(device.kind) {
                    warn!("Ignoring '{}': payload does not match kind {}", device.identity.name, device.kind);
                    return false;
                }
                known.insert(device.device_key())
            })
            .collect();
        registry.reserve(fresh.len())?;

        let mut summary = ScanSummary::default();
        for device in fresh {
            let id = self
                .ctx
                .insert(&mut registry, &config, device.kind, device.identity, device.payload)?;
            summary.added.push(id);

            let component = registry.get_mut(id)?;
            if config.auto_driver_update && component.driver.state == DriverState::Outdated {
                match lifecycle.update(component, false) {
                    Ok(UpdateOutcome::Updated { .. }) => summary.updated += 1,
                    Ok(_) => {}
                    Err(e) => warn!("Automatic driver update for component {} failed: {}", id, e),
                }
            }
        }

        if config.enable_hotplug {
            let gone: Vec<ComponentId> = registry
                .iter()
                .filter(|c| c.driver.supports_hotplug && !present.contains(&c.device_key()))
                .map(|c| c.id)
                .collect();
            for id in gone {
                self.ctx.remove(&mut registry, &config, id)?;
                summary.removed.push(id);
            }
        }

        debug!(
            "Scan via '{}': {} added, {} removed, {} updated",
            self.ctx.source.name(),
            summary.added.len(),
            summary.removed.len(),
            summary.updated
        );
        Ok(summary)
    }

    // Components

    pub fn add(&self, kind: ComponentKind, identity: Identity, payload: Payload) -> HwResult<ComponentId> {
        self.ensure_init()?;
        let config = self.ctx.config.load();
        let mut registry = self.ctx.registry.lock()?;
        self.ctx.insert(&mut registry, &config, kind, identity, payload)
    }

    /// Current storage position of `id`
    pub fn find(&self, id: ComponentId) -> HwResult<usize> {
        self.ensure_init()?;
        self.ctx.registry.lock()?.position(id)
    }

    pub fn remove(&self, id: ComponentId) -> HwResult<()> {
        self.ensure_init()?;
        let config = self.ctx.config.load();
        let mut registry = self.ctx.registry.lock()?;
        self.ctx.remove(&mut registry, &config, id)
    }

    /// Snapshot of one component
    pub fn get(&self, id: ComponentId) -> HwResult<HardwareComponent> {
        self.ensure_init()?;
        Ok(self.ctx.registry.lock()?.get(id)?.clone())
    }

    /// Snapshots of up to `max` components of `kind` (`Unknown` for all)
    pub fn list(&self, kind: ComponentKind, max: usize) -> HwResult<Vec<HardwareComponent>> {
        self.ensure_init()?;
        if max == 0 {
            return Err(HwError::InvalidArg("max must be at least 1".to_string()));
        }
        Ok(self.ctx.registry.lock()?.list(kind, max))
    }

    pub fn count(&self) -> HwResult<usize> {
        self.ensure_init()?;
        Ok(self.ctx.registry.lock()?.len())
    }

    /// Take one telemetry sample for `id` and return the derived status
    pub fn update_status(&self, id: ComponentId) -> HwResult<DeviceStatus> {
        self.ensure_init()?;
        let config = self.ctx.config.load();
        let mut registry = self.ctx.registry.lock()?;
        let component = registry.get_mut(id)?;
        self.ctx.sample(component, &config)
    }

    // Drivers

    fn with_driver<T>(
        &self,
        id: ComponentId,
        op: impl FnOnce(&DriverLifecycle<'_>, &mut HardwareComponent) -> HwResult<T>,
    ) -> HwResult<T> {
        self.ensure_init()?;
        let config = self.ctx.config.load();
        let mut registry = self.ctx.registry.lock()?;
        let component = registry.get_mut(id)?;
        op(&self.ctx.lifecycle(&config), component)
    }

    pub fn load_driver(&self, id: ComponentId, force: bool) -> HwResult<LoadOutcome> {
        self.with_driver(id, |lifecycle, c| lifecycle.load(c, force))
    }

    pub fn unload_driver(&self, id: ComponentId) -> HwResult<UnloadOutcome> {
        self.with_driver(id, |lifecycle, c| lifecycle.unload(c))
    }

    pub fn update_driver(&self, id: ComponentId, check_only: bool) -> HwResult<UpdateOutcome> {
        self.with_driver(id, |lifecycle, c| lifecycle.update(c, check_only))
    }

    pub fn set_enabled(&self, id: ComponentId, enabled: bool) -> HwResult<()> {
        self.with_driver(id, |lifecycle, c| lifecycle.set_enabled(c, enabled))
    }

    // Monitors

    /// Start sampling `target` every `interval`
    ///
    /// A zero interval uses the configured `monitor_interval`; anything below
    /// 100ms is raised to 100ms.
    pub fn start_monitor(
        &self,
        target: impl Into<MonitorTarget>,
        interval: Duration,
        observer: impl MonitorObserver + 'static,
    ) -> HwResult<MonitorId> {
        self.ensure_init()?;
        let config = self.ctx.config.load();
        if !config.enable_monitoring {
            return Err(HwError::NotSupported("monitoring is disabled".to_string()));
        }
        let target = target.into();
        if let MonitorTarget::Component(id) = target {
            if !self.ctx.registry.lock()?.contains(id) {
                return Err(HwError::component_not_found(id));
            }
        }
        let interval = effective_interval(interval, config.monitor_period());
        let poller: Arc<dyn Poller> = self.ctx.clone();
        self.monitors.start(poller, target, interval, Arc::new(observer))
    }

    /// Stop one monitor, or every monitor when `id` is 0
    pub fn stop_monitor(&self, id: MonitorId) -> HwResult<()> {
        self.ensure_init()?;
        self.monitors.stop(id)
    }

    pub fn monitors(&self) -> HwResult<Vec<MonitorInfo>> {
        self.ensure_init()?;
        self.monitors.list()
    }

    // Events and health

    /// Log an event against `component_id` (0 for system-wide) at `severity` 0-4
    pub fn report_event(
        &self,
        component_id: ComponentId,
        event_type: EventType,
        message: impl Into<String>,
        severity: u8,
    ) -> HwResult<()> {
        self.ensure_init()?;
        let severity = Severity::from_level(severity)
            .ok_or_else(|| HwError::InvalidArg(format!("severity {} out of range 0-4", severity)))?;
        let registry = self.ctx.registry.lock()?;
        if component_id != 0 && !registry.contains(component_id) {
            return Err(HwError::component_not_found(component_id));
        }
        self.ctx.reporter.record(component_id, event_type, severity, message)
    }

    pub fn health(&self) -> HwResult<SystemHealth> {
        self.ensure_init()?;
        self.ctx.reporter.health()
    }

    pub fn recent_events(&self, max: usize) -> HwResult<Vec<HardwareEvent>> {
        self.ensure_init()?;
        self.ctx.reporter.recent_events(max)
    }

    pub fn reset_health(&self) -> HwResult<()> {
        self.ensure_init()?;
        info!("System health reset");
        self.ctx.reporter.reset_health()
    }
}
