//! Registry of tracked hardware components
//!
//! The registry is a dense, id-ordered `Vec` behind a single mutex. Positions
//! shift whenever a component is removed, so callers resolve an id to a
//! position afresh every time they hold the lock and never keep positions
//! across a release.

use crate::id_alloc::IdAllocator;
use hwmgr_types::{
    ComponentId, ComponentKind, HardwareComponent, HwError, HwResult, Identity, Payload,
};
use std::sync::{Mutex, MutexGuard};

/// Contents of the registry, reachable only through [`ComponentRegistry::lock`]
#[derive(Default)]
pub struct RegistryState {
    ids: IdAllocator,
    components: Vec<HardwareComponent>,
}

impl RegistryState {
    /// Append a new component and return it for post-insert processing
    ///
    /// Capacity is reserved before an id is drawn, so an allocation failure
    /// leaves both the id counter and the component list untouched.
    pub fn insert(
        &mut self,
        kind: ComponentKind,
        identity: Identity,
        payload: Payload,
    ) -> HwResult<&mut HardwareComponent> {
        if !payload.fits(kind) {
            return Err(HwError::InvalidArg(format!(
                "payload for {:?} attached to a {} component",
                payload.kind(),
                kind
            )));
        }
        self.components.try_reserve(1)?;
        let id = self.ids.allocate()?;
        self.components
            .push(HardwareComponent::new(id, kind, identity, payload));
        let last = self.components.len() - 1;
        Ok(&mut self.components[last])
    }

    /// Make room for `additional` inserts that will not fail on allocation
    pub fn reserve(&mut self, additional: usize) -> HwResult<()> {
        self.components.try_reserve(additional)?;
        Ok(())
    }

    /// Current storage position of `id`
    pub fn position(&self, id: ComponentId) -> HwResult<usize> {
        self.components
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| HwError::component_not_found(id))
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.position(id).is_ok()
    }

    pub fn get(&self, id: ComponentId) -> HwResult<&HardwareComponent> {
        let index = self.position(id)?;
        Ok(&self.components[index])
    }

    pub fn get_mut(&mut self, id: ComponentId) -> HwResult<&mut HardwareComponent> {
        let index = self.position(id)?;
        Ok(&mut self.components[index])
    }

    /// Remove `id`, shifting later components down one slot
    pub fn remove(&mut self, id: ComponentId) -> HwResult<HardwareComponent> {
        let index = self.position(id)?;
        Ok(self.components.remove(index))
    }

    /// Snapshots of up to `max` components matching `filter`
    pub fn list(&self, filter: ComponentKind, max: usize) -> Vec<HardwareComponent> {
        self.components
            .iter()
            .filter(|c| filter.matches(c.kind))
            .take(max)
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HardwareComponent> {
        self.components.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut HardwareComponent> {
        self.components.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Remove every component, returning them in order. Ids keep counting up.
    pub fn drain(&mut self) -> Vec<HardwareComponent> {
        std::mem::take(&mut self.components)
    }
}

/// Lock-serialized owner of all components
#[derive(Default)]
pub struct ComponentRegistry {
    state: Mutex<RegistryState>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the registry lock
    pub fn lock(&self) -> HwResult<MutexGuard<'_, RegistryState>> {
        self.state.lock().map_err(|_| HwError::Mutex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwmgr_types::{CpuInfo, GpuInfo};

    fn insert(state: &mut RegistryState, kind: ComponentKind, name: &str) -> ComponentId {
        state
            .insert(kind, Identity::new(name), Payload::None)
            .unwrap()
            .id
    }

    #[test]
    fn test_ids_increase_and_skip_zero() {
        let mut state = RegistryState::default();
        let a = insert(&mut state, ComponentKind::Cpu, "cpu0");
        let b = insert(&mut state, ComponentKind::Gpu, "gpu0");
        let c = insert(&mut state, ComponentKind::Memory, "ram");
        assert!(a > 0);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_remove_keeps_order_and_ids() {
        let mut state = RegistryState::default();
        let a = insert(&mut state, ComponentKind::Cpu, "a");
        let b = insert(&mut state, ComponentKind::Cpu, "b");
        let c = insert(&mut state, ComponentKind::Cpu, "c");

        assert_eq!(state.position(c).unwrap(), 2);
        state.remove(b).unwrap();

        assert!(matches!(state.position(b), Err(HwError::NotFound { .. })));
        assert_eq!(state.position(a).unwrap(), 0);
        assert_eq!(state.position(c).unwrap(), 1);
        assert_eq!(state.get(c).unwrap().name(), "c");

        // Removed ids are never handed out again
        let d = insert(&mut state, ComponentKind::Cpu, "d");
        assert!(d > c);
    }

    #[test]
    fn test_list_filters_and_truncates() {
        let mut state = RegistryState::default();
        insert(&mut state, ComponentKind::Cpu, "cpu0");
        insert(&mut state, ComponentKind::Gpu, "gpu0");
        insert(&mut state, ComponentKind::Cpu, "cpu1");
        insert(&mut state, ComponentKind::Cpu, "cpu2");

        let cpus = state.list(ComponentKind::Cpu, 2);
        assert_eq!(cpus.len(), 2);
        assert_eq!(cpus[0].name(), "cpu0");
        assert_eq!(cpus[1].name(), "cpu1");

        assert_eq!(state.list(ComponentKind::Unknown, 100).len(), 4);
        assert!(state.list(ComponentKind::Battery, 10).is_empty());
    }

    #[test]
    fn test_mismatched_payload_is_rejected() {
        let mut state = RegistryState::default();
        let result = state.insert(
            ComponentKind::Cpu,
            Identity::new("cpu0"),
            Payload::Gpu(GpuInfo::default()),
        );
        assert!(matches!(result, Err(HwError::InvalidArg(_))));
        assert!(state.is_empty());

        // The failed insert did not consume an id
        let id = state
            .insert(ComponentKind::Cpu, Identity::new("cpu0"), Payload::Cpu(CpuInfo::default()))
            .unwrap()
            .id;
        assert_eq!(id, 1);
    }

    #[test]
    fn test_snapshot_payload_outlives_removal() {
        let mut state = RegistryState::default();
        let id = state
            .insert(
                ComponentKind::Cpu,
                Identity::new("cpu0"),
                Payload::Cpu(CpuInfo {
                    cores: 8,
                    ..CpuInfo::default()
                }),
            )
            .unwrap()
            .id;
        let snapshot = state.get(id).unwrap().clone();
        state.remove(id).unwrap();

        match snapshot.payload.as_ref() {
            Payload::Cpu(info) => assert_eq!(info.cores, 8),
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
