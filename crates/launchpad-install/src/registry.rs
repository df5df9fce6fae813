//! Entity registry: the single gateway for reading and mutating entities.
//!
//! Entities live in a slot arena behind one lock. Callers and background
//! pipelines address them through [`EntityHandle`]s and resolve the handle
//! on every access, so a removal can never leave a task holding a dangling
//! reference: the task's next access reports [`InstallError::Stale`].

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use launchpad_core::{
    CancellationToken, EngineId, EntityHandle, EntityKind, InstallError, InstallResult,
    InstallableEntity, InstallationState,
};
use serde::Serialize;

struct Entry {
    entity: InstallableEntity,
    /// Token for the pipeline currently (or most recently) running.
    cancel: CancellationToken,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct Inner {
    slots: Vec<Slot>,
    free: Vec<usize>,
    next_engine_id: u64,
}

impl Inner {
    fn entry(&self, handle: EntityHandle) -> InstallResult<&Entry> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(InstallError::Stale(handle))
    }

    fn entry_mut(&mut self, handle: EntityHandle) -> InstallResult<&mut Entry> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(InstallError::Stale(handle))
    }

    fn take(&mut self, handle: EntityHandle) -> InstallResult<InstallableEntity> {
        self.entry(handle)?;
        let slot = &mut self.slots[handle.index()];
        let entry = slot.entry.take().ok_or(InstallError::Stale(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        Ok(entry.entity)
    }

    fn live(&self) -> impl Iterator<Item = (EntityHandle, &InstallableEntity)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                (
                    EntityHandle::new(slot_index(index), slot.generation),
                    &entry.entity,
                )
            })
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn slot_index(index: usize) -> u32 {
    index as u32
}

/// Installed counts, derived from the registry on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallCounts {
    pub engines: usize,
    pub engines_installed: usize,
    pub plugins: usize,
    pub plugins_installed: usize,
    pub templates: usize,
    pub templates_installed: usize,
    pub projects: usize,
    pub active_pipelines: usize,
}

/// Arena of entities with generation-checked handles.
#[derive(Default)]
pub struct EntityRegistry {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an entity and return its handle.
    ///
    /// Engine ids are kept above every id seen so far, so ids loaded from
    /// disk are never reissued.
    pub fn insert(&self, entity: InstallableEntity) -> EntityHandle {
        let mut inner = self.write();
        if let Some(id) = entity.engine_id() {
            inner.next_engine_id = inner.next_engine_id.max(id.0 + 1);
        }
        let entry = Entry {
            entity,
            cancel: CancellationToken::new(),
        };

        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index];
            slot.entry = Some(entry);
            return EntityHandle::new(slot_index(index), slot.generation);
        }

        inner.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        EntityHandle::new(slot_index(inner.slots.len() - 1), 0)
    }

    /// Remove an entity. Every outstanding handle to it becomes stale.
    pub fn remove(&self, handle: EntityHandle) -> InstallResult<InstallableEntity> {
        self.write().take(handle)
    }

    /// Remove an entity unless a pipeline is running on it.
    ///
    /// The state check and the removal share one write lock, so no pipeline
    /// can be admitted in between.
    pub fn remove_if_idle(&self, handle: EntityHandle) -> InstallResult<InstallableEntity> {
        let mut inner = self.write();
        let entity = &inner.entry(handle)?.entity;
        if entity.state.is_active() {
            return Err(InstallError::busy(entity.name.clone(), entity.state));
        }
        inner.take(handle)
    }

    /// Reserve a fresh engine id.
    pub fn allocate_engine_id(&self) -> EngineId {
        let mut inner = self.write();
        let id = EngineId(inner.next_engine_id);
        inner.next_engine_id += 1;
        id
    }

    #[must_use]
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.read().entry(handle).is_ok()
    }

    /// Snapshot of one entity.
    pub fn get(&self, handle: EntityHandle) -> InstallResult<InstallableEntity> {
        self.read().entry(handle).map(|e| e.entity.clone())
    }

    /// Read one field without cloning the whole entity.
    pub fn with<R>(
        &self,
        handle: EntityHandle,
        f: impl FnOnce(&InstallableEntity) -> R,
    ) -> InstallResult<R> {
        self.read().entry(handle).map(|e| f(&e.entity))
    }

    /// Mutate one entity under the registry lock.
    pub fn update<R>(
        &self,
        handle: EntityHandle,
        f: impl FnOnce(&mut InstallableEntity) -> R,
    ) -> InstallResult<R> {
        self.write().entry_mut(handle).map(|e| f(&mut e.entity))
    }

    /// Atomically admit a new pipeline for `handle`.
    ///
    /// Refuses while another pipeline is active. Otherwise sets `state`,
    /// resets progress to `total_steps`, and issues a fresh cancellation
    /// token which is also returned.
    pub fn begin_pipeline(
        &self,
        handle: EntityHandle,
        state: InstallationState,
        total_steps: u32,
    ) -> InstallResult<(CancellationToken, InstallationState)> {
        self.begin_pipeline_if(handle, state, total_steps, |_| Ok(()))
    }

    /// Like [`begin_pipeline`](Self::begin_pipeline), with an extra admission
    /// check evaluated under the same lock.
    pub fn begin_pipeline_if(
        &self,
        handle: EntityHandle,
        state: InstallationState,
        total_steps: u32,
        admit: impl FnOnce(&InstallableEntity) -> InstallResult<()>,
    ) -> InstallResult<(CancellationToken, InstallationState)> {
        let mut inner = self.write();
        let entry = inner.entry_mut(handle)?;
        let previous = entry.entity.state;
        if previous.is_active() {
            return Err(InstallError::busy(entry.entity.name.clone(), previous));
        }
        admit(&entry.entity)?;

        entry.entity.state = state;
        entry.entity.progress.begin(total_steps);
        entry.cancel = CancellationToken::new();
        Ok((entry.cancel.clone(), previous))
    }

    /// Signal the running pipeline of `handle` to stop. Returns the token
    /// that was signalled, or `None` when nothing was running.
    pub fn request_cancel(&self, handle: EntityHandle) -> InstallResult<Option<CancellationToken>> {
        let mut inner = self.write();
        let entry = inner.entry_mut(handle)?;
        if !entry.entity.state.is_active() {
            return Ok(None);
        }
        entry.entity.progress.cancel_requested = true;
        Ok(Some(entry.cancel.clone()))
    }

    /// Snapshot of every live entity, in slot order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(EntityHandle, InstallableEntity)> {
        self.read()
            .live()
            .map(|(handle, entity)| (handle, entity.clone()))
            .collect()
    }

    #[must_use]
    pub fn snapshot_kind(&self, kind: EntityKind) -> Vec<(EntityHandle, InstallableEntity)> {
        self.read()
            .live()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(handle, entity)| (handle, entity.clone()))
            .collect()
    }

    /// First entity of `kind` named `name` (case-sensitive).
    #[must_use]
    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Option<EntityHandle> {
        self.read()
            .live()
            .find(|(_, e)| e.kind() == kind && e.name == name)
            .map(|(handle, _)| handle)
    }

    /// First entity of `kind` rooted at `path`.
    #[must_use]
    pub fn find_by_path(&self, kind: EntityKind, path: &std::path::Path) -> Option<EntityHandle> {
        self.read()
            .live()
            .find(|(_, e)| e.kind() == kind && e.path == path)
            .map(|(handle, _)| handle)
    }

    #[must_use]
    pub fn find_engine(&self, id: EngineId) -> Option<(EntityHandle, InstallableEntity)> {
        self.read()
            .live()
            .find(|(_, e)| e.engine_id() == Some(id))
            .map(|(handle, entity)| (handle, entity.clone()))
    }

    #[must_use]
    pub fn first_engine(&self) -> Option<(EntityHandle, InstallableEntity)> {
        self.read()
            .live()
            .find(|(_, e)| e.kind() == EntityKind::Engine)
            .map(|(handle, entity)| (handle, entity.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().live().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts computed from the current contents.
    #[must_use]
    pub fn counts(&self) -> InstallCounts {
        let inner = self.read();
        let mut counts = InstallCounts::default();
        for (_, entity) in inner.live() {
            let installed = entity.state == InstallationState::Installed;
            match entity.kind() {
                EntityKind::Engine => {
                    counts.engines += 1;
                    counts.engines_installed += usize::from(installed);
                }
                EntityKind::Plugin => {
                    counts.plugins += 1;
                    counts.plugins_installed += usize::from(installed);
                }
                EntityKind::Template => {
                    counts.templates += 1;
                    counts.templates_installed += usize::from(installed);
                }
                EntityKind::Project => counts.projects += 1,
            }
            counts.active_pipelines += usize::from(entity.state.is_active());
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(name: &str) -> InstallableEntity {
        InstallableEntity::plugin(name, format!("/plugins/{name}"), "")
    }

    #[test]
    fn removed_handle_goes_stale_and_slot_is_reused() {
        let registry = EntityRegistry::new();
        let first = registry.insert(plugin("A"));
        registry.remove(first).unwrap();

        let second = registry.insert(plugin("B"));
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);

        assert!(matches!(registry.get(first), Err(InstallError::Stale(_))));
        assert!(registry.update(first, |e| e.name.clear()).is_err());
        assert_eq!(registry.get(second).unwrap().name, "B");
    }

    #[test]
    fn double_remove_is_stale() {
        let registry = EntityRegistry::new();
        let handle = registry.insert(plugin("A"));
        registry.remove(handle).unwrap();
        assert!(registry.remove(handle).unwrap_err().is_stale());
    }

    #[test]
    fn remove_if_idle_refuses_running_pipeline() {
        let registry = EntityRegistry::new();
        let handle = registry.insert(plugin("A"));
        registry
            .begin_pipeline(handle, InstallationState::Installing, 1)
            .unwrap();

        let err = registry.remove_if_idle(handle).unwrap_err();
        assert!(matches!(err, InstallError::Busy { .. }));
        assert!(registry.contains(handle));

        registry
            .update(handle, |e| e.state = InstallationState::Failed)
            .unwrap();
        assert_eq!(registry.remove_if_idle(handle).unwrap().name, "A");
        assert!(!registry.contains(handle));
    }

    #[test]
    fn removal_and_admission_never_both_succeed() {
        for _ in 0..200 {
            let registry = std::sync::Arc::new(EntityRegistry::new());
            let handle = registry.insert(plugin("A"));

            let remover = {
                let registry = registry.clone();
                std::thread::spawn(move || registry.remove_if_idle(handle).is_ok())
            };
            let admitted = registry
                .begin_pipeline(handle, InstallationState::Installing, 1)
                .is_ok();
            let removed = remover.join().unwrap();

            assert!(admitted ^ removed, "admitted={admitted} removed={removed}");
        }
    }

    #[test]
    fn begin_pipeline_refuses_active_entities() {
        let registry = EntityRegistry::new();
        let handle = registry.insert(plugin("A"));

        let (token, previous) = registry
            .begin_pipeline(handle, InstallationState::Installing, 1)
            .unwrap();
        assert_eq!(previous, InstallationState::NotInstalled);
        assert!(!token.is_cancelled());

        let err = registry
            .begin_pipeline(handle, InstallationState::Wait, 0)
            .unwrap_err();
        assert!(matches!(err, InstallError::Busy { .. }));
        assert_eq!(registry.get(handle).unwrap().state, InstallationState::Installing);
    }

    #[test]
    fn rejected_admission_leaves_entity_untouched() {
        let registry = EntityRegistry::new();
        let handle = registry.insert(plugin("A").with_state(InstallationState::Installed));

        let err = registry
            .begin_pipeline_if(handle, InstallationState::Installing, 1, |e| {
                Err(InstallError::Invalid(format!("{} is already installed", e.name)))
            })
            .unwrap_err();
        assert!(matches!(err, InstallError::Invalid(_)));
        let entity = registry.get(handle).unwrap();
        assert_eq!(entity.state, InstallationState::Installed);
        assert_eq!(entity.progress.total_steps, 0);
    }

    #[test]
    fn request_cancel_only_signals_running_pipelines() {
        let registry = EntityRegistry::new();
        let handle = registry.insert(plugin("A"));
        assert!(registry.request_cancel(handle).unwrap().is_none());

        let (token, _) = registry
            .begin_pipeline(handle, InstallationState::Installing, 1)
            .unwrap();
        let signalled = registry.request_cancel(handle).unwrap().unwrap();
        signalled.cancel();
        assert!(token.is_cancelled());
        assert!(registry.get(handle).unwrap().progress.cancel_requested);
    }

    #[test]
    fn new_pipeline_gets_fresh_token() {
        let registry = EntityRegistry::new();
        let handle = registry.insert(plugin("A"));
        let (first, _) = registry
            .begin_pipeline(handle, InstallationState::Installing, 1)
            .unwrap();
        first.cancel();
        registry
            .update(handle, |e| e.state = InstallationState::NotInstalled)
            .unwrap();

        let (second, _) = registry
            .begin_pipeline(handle, InstallationState::Installing, 1)
            .unwrap();
        assert!(!second.is_cancelled());
    }

    #[test]
    fn counts_are_derived_from_states() {
        let registry = EntityRegistry::new();
        registry.insert(plugin("A").with_state(InstallationState::Installed));
        registry.insert(plugin("B"));
        registry.insert(
            InstallableEntity::engine(EngineId(4), "/e/HydraEngine")
                .with_state(InstallationState::Installing),
        );

        let counts = registry.counts();
        assert_eq!(counts.plugins, 2);
        assert_eq!(counts.plugins_installed, 1);
        assert_eq!(counts.engines, 1);
        assert_eq!(counts.engines_installed, 0);
        assert_eq!(counts.active_pipelines, 1);
    }

    #[test]
    fn engine_ids_skip_loaded_ids() {
        let registry = EntityRegistry::new();
        registry.insert(InstallableEntity::engine(EngineId(7), "/e/HydraEngine"));
        assert_eq!(registry.allocate_engine_id(), EngineId(8));
    }

    #[test]
    fn find_helpers_match_kind() {
        let registry = EntityRegistry::new();
        let handle = registry.insert(plugin("Physics"));
        assert_eq!(registry.find_by_name(EntityKind::Plugin, "Physics"), Some(handle));
        assert_eq!(registry.find_by_name(EntityKind::Template, "Physics"), None);
        assert_eq!(
            registry.find_by_path(EntityKind::Plugin, std::path::Path::new("/plugins/Physics")),
            Some(handle)
        );
    }
}
