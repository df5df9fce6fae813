//! Installation orchestrator.
//!
//! Owns the entity registry and runs the Download, Build and Delete
//! pipelines on the task queue. `request_*` calls return errors only for
//! admission (busy, stale handle, unusable destination); everything after a
//! pipeline starts is reported through the entity's state and progress and
//! through [`InstallEvent`]s.
//!
//! # Concurrency Model
//!
//! - Every read and write goes through [`EntityRegistry`]
//! - Pipelines hold an [`EntityHandle`] and resolve it on each access; a
//!   stale handle ends the pipeline quietly
//! - Admission and the state change to the pipeline's first state happen
//!   under one registry lock, so two requests can never both be admitted
//! - Saves are serialized: the snapshot and the write happen under one lock

mod build;
mod catalog;
mod delete;
mod download;
mod observer;
mod persist;
mod project;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use launchpad_core::paths;
use launchpad_core::{
    CancellationToken, CatalogSource, EntityHandle, EntityKind, InstallError, InstallEvent,
    InstallEventEmitter, InstallResult, InstallableEntity, InstallationState, LauncherStore,
    PipelineKind, PipelineOutcome, ProcessRunner, Progress, RemoteTransfer, Settings,
    SettingsUpdate, TransferUpdate, validate_settings,
};
use tracing::{debug, info, warn};

use crate::queue::TaskQueue;
use crate::registry::{EntityRegistry, InstallCounts};

pub use catalog::{CatalogSyncReport, DiscoveryReport};
pub use project::ProjectFile;

/// Adapters the orchestrator drives.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub transfer: Arc<dyn RemoteTransfer>,
    pub runner: Arc<dyn ProcessRunner>,
    pub store: Arc<dyn LauncherStore>,
    pub catalog: Arc<dyn CatalogSource>,
    pub events: Arc<dyn InstallEventEmitter>,
}

/// Directories under the data root the orchestrator reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherDirs {
    pub data_root: PathBuf,
    pub plugins_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub catalog_cache: PathBuf,
}

impl LauncherDirs {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let data_root = root.into();
        Self {
            plugins_dir: paths::plugins_dir(&data_root),
            templates_dir: paths::templates_dir(&data_root),
            catalog_cache: paths::catalog_cache_path(&data_root),
            data_root,
        }
    }
}

// =============================================================================
// Shared pipeline context
// =============================================================================

pub(crate) struct Context {
    registry: EntityRegistry,
    queue: TaskQueue,
    deps: OrchestratorDeps,
    settings: RwLock<Settings>,
    dirs: LauncherDirs,
    /// Held from snapshot to write so saves land in the order they were taken.
    save_lock: tokio::sync::Mutex<()>,
}

impl Context {
    fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, event: InstallEvent) {
        self.deps.events.emit(event);
    }

    /// Admit a pipeline and announce the transition into its first state.
    fn begin(
        &self,
        handle: EntityHandle,
        state: InstallationState,
        total_steps: u32,
        admit: impl FnOnce(&InstallableEntity) -> InstallResult<()>,
    ) -> InstallResult<(CancellationToken, InstallableEntity)> {
        let (cancel, previous) = self
            .registry
            .begin_pipeline_if(handle, state, total_steps, admit)?;
        let entity = self.registry.get(handle)?;
        self.emit(InstallEvent::StateChanged {
            handle,
            name: entity.name.clone(),
            from: previous,
            to: state,
        });
        Ok((cancel, entity))
    }

    fn transition(&self, handle: EntityHandle, to: InstallationState) -> InstallResult<()> {
        let (name, from) = self.registry.update(handle, |e| {
            let from = e.state;
            e.state = to;
            (e.name.clone(), from)
        })?;
        if from != to {
            debug!(entity = %name, %from, %to, "state changed");
            self.emit(InstallEvent::StateChanged {
                handle,
                name,
                from,
                to,
            });
        }
        Ok(())
    }

    fn update_progress(
        &self,
        handle: EntityHandle,
        f: impl FnOnce(&mut Progress),
    ) -> InstallResult<()> {
        let progress = self.registry.update(handle, |e| {
            f(&mut e.progress);
            e.progress.clone()
        })?;
        self.emit(InstallEvent::Progress { handle, progress });
        Ok(())
    }

    fn set_step(&self, handle: EntityHandle, step: impl Into<String>) -> InstallResult<()> {
        let step = step.into();
        self.update_progress(handle, |p| p.set_step(step))
    }

    fn complete_step(&self, handle: EntityHandle) -> InstallResult<()> {
        self.update_progress(handle, Progress::complete_step)
    }

    /// Report `done` of `total` sub-steps inside the current step.
    #[allow(clippy::cast_precision_loss)]
    fn report_substeps(&self, handle: EntityHandle, done: u32, total: u32) -> InstallResult<()> {
        self.update_progress(handle, |p| {
            let fraction = if total == 0 { 1.0 } else { done as f32 / total as f32 };
            let update = TransferUpdate::new(
                p.step_name.clone(),
                u64::from(done),
                u64::from(total),
                fraction,
            );
            p.apply_transfer(&update);
        })
    }

    /// Resolve a pipeline: set its final state, clear progress and announce.
    fn finish(
        &self,
        handle: EntityHandle,
        name: &str,
        pipeline: PipelineKind,
        state: InstallationState,
        outcome: PipelineOutcome,
    ) {
        let updated = self.registry.update(handle, |e| {
            let from = e.state;
            e.state = state;
            e.progress.reset();
            from
        });
        let Ok(from) = updated else {
            self.abandon(handle, name, pipeline);
            return;
        };

        match &outcome {
            PipelineOutcome::Succeeded => info!(entity = %name, %pipeline, %state, "pipeline finished"),
            PipelineOutcome::Canceled => info!(entity = %name, %pipeline, %state, "pipeline canceled"),
            PipelineOutcome::Failed { reason } => {
                warn!(entity = %name, %pipeline, %state, %reason, "pipeline failed");
            }
            PipelineOutcome::Abandoned => {}
        }

        if from != state {
            self.emit(InstallEvent::StateChanged {
                handle,
                name: name.to_string(),
                from,
                to: state,
            });
        }
        self.emit(InstallEvent::PipelineFinished {
            handle,
            name: name.to_string(),
            pipeline,
            outcome,
        });
    }

    /// The entity went away while its pipeline ran.
    fn abandon(&self, handle: EntityHandle, name: &str, pipeline: PipelineKind) {
        debug!(entity = %name, %pipeline, "entity removed, pipeline abandoned");
        self.emit(InstallEvent::PipelineFinished {
            handle,
            name: name.to_string(),
            pipeline,
            outcome: PipelineOutcome::Abandoned,
        });
    }

    /// Run `work` on the task queue. A panic marks the entity `Failed`.
    fn spawn_pipeline<F>(self: &Arc<Self>, handle: EntityHandle, name: String, pipeline: PipelineKind, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ctx = Arc::clone(self);
        let label = format!("{pipeline} {name}");
        self.queue.submit(label, work, move |message| {
            ctx.finish(
                handle,
                &name,
                pipeline,
                InstallationState::Failed,
                PipelineOutcome::Failed {
                    reason: format!("pipeline panicked: {message}"),
                },
            );
        });
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Front door for every launcher operation.
///
/// Cheap to clone; clones share one registry and queue.
#[derive(Clone)]
pub struct InstallationOrchestrator {
    ctx: Arc<Context>,
}

impl std::fmt::Debug for InstallationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationOrchestrator")
            .field("registry", &self.ctx.registry)
            .field("dirs", &self.ctx.dirs)
            .finish_non_exhaustive()
    }
}

impl InstallationOrchestrator {
    /// Create an orchestrator whose pipelines run on the current Tokio runtime.
    ///
    /// Panics outside a Tokio runtime.
    #[must_use]
    pub fn new(deps: OrchestratorDeps, settings: Settings, dirs: LauncherDirs) -> Self {
        Self::with_queue(deps, settings, dirs, TaskQueue::current())
    }

    #[must_use]
    pub fn with_queue(
        deps: OrchestratorDeps,
        settings: Settings,
        dirs: LauncherDirs,
        queue: TaskQueue,
    ) -> Self {
        Self {
            ctx: Arc::new(Context {
                registry: EntityRegistry::new(),
                queue,
                deps,
                settings: RwLock::new(settings),
                dirs,
                save_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.ctx.registry
    }

    #[must_use]
    pub fn dirs(&self) -> &LauncherDirs {
        &self.ctx.dirs
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<(EntityHandle, InstallableEntity)> {
        self.ctx.registry.snapshot()
    }

    pub fn get(&self, handle: EntityHandle) -> InstallResult<InstallableEntity> {
        self.ctx.registry.get(handle)
    }

    #[must_use]
    pub fn counts(&self) -> InstallCounts {
        self.ctx.registry.counts()
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.ctx.settings()
    }

    /// Apply a partial update. The result is validated before it is stored.
    pub fn update_settings(&self, update: &SettingsUpdate) -> InstallResult<Settings> {
        let mut guard = self
            .ctx
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        next.merge(update);
        validate_settings(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    /// Register a not-yet-downloaded engine instance at `path`.
    pub fn add_engine(&self, path: impl Into<PathBuf>) -> EntityHandle {
        let path = path.into();
        if let Some(existing) = self.ctx.registry.find_by_path(EntityKind::Engine, &path) {
            return existing;
        }
        let id = self.ctx.registry.allocate_engine_id();
        info!(engine = %id, path = %path.display(), "engine registered");
        self.ctx.registry.insert(InstallableEntity::engine(id, path))
    }

    /// Signal the running pipeline of `handle` to stop.
    ///
    /// Returns `false` when nothing was running.
    pub fn request_cancel(&self, handle: EntityHandle) -> InstallResult<bool> {
        let Some(token) = self.ctx.registry.request_cancel(handle)? else {
            return Ok(false);
        };
        self.ctx.deps.transfer.cancel(&token);
        let name = self.ctx.registry.with(handle, |e| e.name.clone())?;
        info!(entity = %name, "cancel requested");
        Ok(true)
    }

    /// Cancel every running pipeline. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        self.ctx
            .registry
            .snapshot()
            .into_iter()
            .filter(|(_, e)| e.state.is_active())
            .filter(|(handle, _)| self.request_cancel(*handle).unwrap_or(false))
            .count()
    }

    /// Drop an entity from the list without touching its files.
    pub fn remove_entity(&self, handle: EntityHandle) -> InstallResult<InstallableEntity> {
        let removed = self.ctx.registry.remove_if_idle(handle)?;
        info!(entity = %removed.name, "entity removed from list");
        Ok(removed)
    }

    /// Wait until every queued pipeline has finished.
    pub async fn wait_idle(&self) {
        self.ctx.queue.drain().await;
    }

    /// Resolve an entity by kind and name, for front ends that take names.
    #[must_use]
    pub fn find(&self, kind: EntityKind, name: &str) -> Option<EntityHandle> {
        self.ctx.registry.find_by_name(kind, name)
    }

    #[must_use]
    pub fn find_by_path(&self, kind: EntityKind, path: &Path) -> Option<EntityHandle> {
        self.ctx.registry.find_by_path(kind, path)
    }
}
