//! Periodic monitors, one OS thread each
//!
//! Each monitor thread waits on a cancellation channel with the sampling
//! interval as timeout. Stopping a monitor drops the sending half, which wakes
//! the thread right away instead of after the remainder of its interval.

use crate::id_alloc::IdAllocator;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use hwmgr_types::{ComponentId, HardwareComponent, HwError, HwResult, MonitorId, ALL_COMPONENTS};
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shortest interval a monitor will sample at
pub const MIN_MONITOR_INTERVAL: Duration = Duration::from_millis(100);

/// What a monitor samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorTarget {
    All,
    Component(ComponentId),
}

impl From<ComponentId> for MonitorTarget {
    fn from(id: ComponentId) -> Self {
        if id == ALL_COMPONENTS {
            MonitorTarget::All
        } else {
            MonitorTarget::Component(id)
        }
    }
}

impl fmt::Display for MonitorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorTarget::All => f.write_str("all"),
            MonitorTarget::Component(id) => write!(f, "component {}", id),
        }
    }
}

/// Receives every sampled component
///
/// Called with the registry lock held; implementations must return quickly
/// and must not call back into the manager.
pub trait MonitorObserver: Send + Sync {
    fn on_sample(&self, monitor: MonitorId, component: &HardwareComponent);
}

impl<F> MonitorObserver for F
where
    F: Fn(MonitorId, &HardwareComponent) + Send + Sync,
{
    fn on_sample(&self, monitor: MonitorId, component: &HardwareComponent) {
        self(monitor, component)
    }
}

/// One sampling pass over a target, visiting each sampled component
pub(crate) trait Poller: Send + Sync + 'static {
    fn poll(&self, target: MonitorTarget, visit: &mut dyn FnMut(&HardwareComponent)) -> HwResult<usize>;
}

/// Public view of a running monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorInfo {
    pub id: MonitorId,
    pub target: MonitorTarget,
    pub interval: Duration,
    pub running: bool,
}

/// Raise `requested` to the floor, substituting `default` for zero
pub fn effective_interval(requested: Duration, default: Duration) -> Duration {
    let interval = if requested.is_zero() { default } else { requested };
    interval.max(MIN_MONITOR_INTERVAL)
}

struct MonitorRecord {
    id: MonitorId,
    target: MonitorTarget,
    interval: Duration,
    running: Arc<AtomicBool>,
    cancel: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorRecord {
    fn info(&self) -> MonitorInfo {
        MonitorInfo {
            id: self.id,
            target: self.target,
            interval: self.interval,
            running: self.running.load(Ordering::Acquire),
        }
    }

    /// Signal the thread and wait for it to exit
    fn shutdown(mut self) -> HwResult<()> {
        self.running.store(false, Ordering::Release);
        drop(self.cancel.take());

        let Some(handle) = self.thread.take() else {
            return Ok(());
        };
        if handle.thread().id() == thread::current().id() {
            warn!("Monitor {} stopped from its own thread; not joining", self.id);
            return Ok(());
        }
        handle
            .join()
            .map_err(|_| HwError::Thread(format!("monitor {} panicked", self.id)))?;
        debug!("Monitor {} joined", self.id);
        Ok(())
    }
}

#[derive(Default)]
struct MonitorTable {
    ids: IdAllocator,
    monitors: Vec<MonitorRecord>,
}

/// Owner of all monitor threads
#[derive(Default)]
pub(crate) struct MonitorEngine {
    table: Mutex<MonitorTable>,
}

impl MonitorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> HwResult<MutexGuard<'_, MonitorTable>> {
        self.table.lock().map_err(|_| HwError::Mutex)
    }

    /// Spawn a monitor thread; `interval` has already been resolved
    pub fn start(
        &self,
        poller: Arc<dyn Poller>,
        target: MonitorTarget,
        interval: Duration,
        observer: Arc<dyn MonitorObserver>,
    ) -> HwResult<MonitorId> {
        let interval = interval.max(MIN_MONITOR_INTERVAL);
        let mut table = self.lock()?;
        table.monitors.try_reserve(1)?;
        let id = table.ids.peek()?;

        let running = Arc::new(AtomicBool::new(true));
        let (cancel, cancelled) = channel::bounded::<()>(0);
        let thread_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(format!("hwmgr-monitor-{}", id))
            .spawn(move || run_monitor(id, target, interval, poller, observer, thread_running, cancelled))
            .map_err(|e| HwError::Thread(format!("failed to spawn monitor {}: {}", id, e)))?;

        table.ids.allocate()?;
        table.monitors.push(MonitorRecord {
            id,
            target,
            interval,
            running,
            cancel: Some(cancel),
            thread: Some(thread),
        });
        info!("Started monitor {} on {} every {:?}", id, target, interval);
        Ok(id)
    }

    /// Stop one monitor, or all of them when `id` is 0
    pub fn stop(&self, id: MonitorId) -> HwResult<()> {
        // Records leave the table before any thread is joined
        let taken = {
            let mut table = self.lock()?;
            if id == 0 {
                std::mem::take(&mut table.monitors)
            } else {
                let index = table
                    .monitors
                    .iter()
                    .position(|m| m.id == id)
                    .ok_or_else(|| HwError::monitor_not_found(id))?;
                vec![table.monitors.remove(index)]
            }
        };

        let mut result = Ok(());
        for record in taken {
            let monitor = record.id;
            if let Err(e) = record.shutdown() {
                warn!("Stopping monitor {} failed: {}", monitor, e);
                if result.is_ok() {
                    result = Err(e);
                }
            } else {
                info!("Stopped monitor {}", monitor);
            }
        }
        result
    }

    pub fn list(&self) -> HwResult<Vec<MonitorInfo>> {
        Ok(self.lock()?.monitors.iter().map(MonitorRecord::info).collect())
    }

    pub fn len(&self) -> HwResult<usize> {
        Ok(self.lock()?.monitors.len())
    }
}

impl Drop for MonitorEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop(0) {
            warn!("Monitors not stopped cleanly: {}", e);
        }
    }
}

fn run_monitor(
    id: MonitorId,
    target: MonitorTarget,
    interval: Duration,
    poller: Arc<dyn Poller>,
    observer: Arc<dyn MonitorObserver>,
    running: Arc<AtomicBool>,
    cancelled: Receiver<()>,
) {
    debug!("Monitor {} thread started", id);
    let _running = ClearOnExit(Arc::clone(&running));
    while running.load(Ordering::Acquire) {
        match poller.poll(target, &mut |component| observer.on_sample(id, component)) {
            Ok(sampled) => trace!("Monitor {} sampled {} component(s)", id, sampled),
            Err(e) => warn!("Monitor {} sampling failed: {}", id, e),
        }

        match cancelled.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Monitor {} thread exiting", id);
}

/// Clears the running flag however the monitor thread ends, unwinding included
struct ClearOnExit(Arc<AtomicBool>);

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwmgr_types::{ComponentKind, Identity, Payload};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct CountingPoller {
        polls: AtomicUsize,
    }

    impl Poller for CountingPoller {
        fn poll(&self, _target: MonitorTarget, visit: &mut dyn FnMut(&HardwareComponent)) -> HwResult<usize> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let component = HardwareComponent::new(7, ComponentKind::Sensor, Identity::new("sensor7"), Payload::None);
            visit(&component);
            Ok(1)
        }
    }

    fn poller() -> Arc<CountingPoller> {
        Arc::new(CountingPoller {
            polls: AtomicUsize::new(0),
        })
    }

    fn quiet() -> Arc<dyn MonitorObserver> {
        Arc::new(|_: MonitorId, _: &HardwareComponent| {})
    }

    #[test]
    fn test_effective_interval() {
        let default = Duration::from_secs(1);
        assert_eq!(effective_interval(Duration::ZERO, default), default);
        assert_eq!(effective_interval(Duration::from_millis(50), default), MIN_MONITOR_INTERVAL);
        assert_eq!(effective_interval(Duration::from_millis(250), default), Duration::from_millis(250));
    }

    #[test]
    fn test_start_stop_restores_table() {
        let engine = MonitorEngine::new();
        let poller = poller();
        let first = engine.start(poller.clone(), MonitorTarget::All, MIN_MONITOR_INTERVAL, quiet()).unwrap();
        let before = engine.len().unwrap();

        let second = engine.start(poller.clone(), MonitorTarget::Component(7), MIN_MONITOR_INTERVAL, quiet()).unwrap();
        assert!(second > first);
        assert_eq!(engine.len().unwrap(), before + 1);

        engine.stop(second).unwrap();
        assert_eq!(engine.len().unwrap(), before);
        assert!(matches!(engine.stop(second), Err(HwError::NotFound { .. })));
    }

    #[test]
    fn test_stop_all_is_idempotent() {
        let engine = MonitorEngine::new();
        let poller = poller();
        for _ in 0..3 {
            engine.start(poller.clone(), MonitorTarget::All, MIN_MONITOR_INTERVAL, quiet()).unwrap();
        }
        engine.stop(0).unwrap();
        assert_eq!(engine.len().unwrap(), 0);
        engine.stop(0).unwrap();
        assert_eq!(engine.len().unwrap(), 0);
    }

    #[test]
    fn test_stop_wakes_long_interval_monitor() {
        let engine = MonitorEngine::new();
        let poller = poller();
        let id = engine
            .start(poller.clone(), MonitorTarget::All, Duration::from_secs(60), quiet())
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while poller.polls.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let started = Instant::now();
        engine.stop(id).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(poller.polls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_observer_receives_monitor_id() {
        let engine = MonitorEngine::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn MonitorObserver> = Arc::new(move |monitor: MonitorId, c: &HardwareComponent| {
            sink.lock().unwrap().push((monitor, c.id));
        });
        let id = engine.start(poller(), MonitorTarget::All, MIN_MONITOR_INTERVAL, observer).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while seen.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        engine.stop(id).unwrap();
        assert_eq!(seen.lock().unwrap()[0], (id, 7));
    }

    #[test]
    fn test_list_reports_running_monitors() {
        let engine = MonitorEngine::new();
        let id = engine
            .start(poller(), MonitorTarget::Component(3), Duration::from_millis(200), quiet())
            .unwrap();
        let monitors = engine.list().unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].id, id);
        assert_eq!(monitors[0].target, MonitorTarget::Component(3));
        assert_eq!(monitors[0].interval, Duration::from_millis(200));
        assert!(monitors[0].running);
    }

    struct PanickingPoller;

    impl Poller for PanickingPoller {
        fn poll(&self, _target: MonitorTarget, _visit: &mut dyn FnMut(&HardwareComponent)) -> HwResult<usize> {
            panic!("sampling blew up");
        }
    }

    #[test]
    fn test_panicked_monitor_reports_not_running() {
        let engine = MonitorEngine::new();
        let id = engine
            .start(Arc::new(PanickingPoller), MonitorTarget::All, MIN_MONITOR_INTERVAL, quiet())
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while engine.list().unwrap()[0].running && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!engine.list().unwrap()[0].running);

        assert!(matches!(engine.stop(id), Err(HwError::Thread(_))));
        assert_eq!(engine.len().unwrap(), 0);
    }
}
