//! Saving and restoring launcher state.

use std::sync::PoisonError;

use launchpad_core::{
    EngineRecord, EntityDetails, EntityKind, InstallResult, InstallableEntity, InstallationState,
    LauncherState, ProjectRecord, validate_settings,
};
use tracing::{debug, info, warn};

use super::{Context, InstallationOrchestrator};

impl Context {
    /// Engines and projects with their coarse state.
    ///
    /// Transient states are written as the state they settle into, so a
    /// crash mid-pipeline never persists `Installing`.
    fn launcher_state(&self) -> LauncherState {
        let mut state = LauncherState {
            settings: self.settings(),
            ..LauncherState::default()
        };
        for (_, entity) in self.registry.snapshot() {
            match entity.details {
                EntityDetails::Engine { id, commit_id } => state.engines.push(EngineRecord {
                    id,
                    path: entity.path,
                    state: entity.state.persisted(),
                    commit_id,
                }),
                EntityDetails::Project {
                    engine_id,
                    include_source_code,
                    build_dir,
                } => state.projects.push(ProjectRecord {
                    name: entity.name,
                    path: entity.path,
                    include_source_code,
                    engine_id,
                    build_dir,
                }),
                EntityDetails::Plugin { .. } | EntityDetails::Template { .. } => {}
            }
        }
        state
    }

    async fn save_state(&self) -> InstallResult<LauncherState> {
        let _guard = self.save_lock.lock().await;
        let state = self.launcher_state();
        self.deps.store.save(&state).await?;
        Ok(state)
    }

    /// Best-effort save after a pipeline; failures are logged.
    pub(super) async fn persist(&self) {
        if let Err(e) = self.save_state().await {
            warn!(error = %e, "failed to persist launcher state");
        }
    }
}

impl InstallationOrchestrator {
    pub async fn save(&self) -> InstallResult<()> {
        let state = self.ctx.save_state().await?;
        debug!(engines = state.engines.len(), projects = state.projects.len(), "launcher state saved");
        Ok(())
    }

    /// Restore settings, engines and projects from the store.
    ///
    /// Returns `false` when nothing was saved yet. Entries already in the
    /// registry (same path) are kept as they are. An engine recorded as
    /// installed whose directory has vanished comes back `NotInstalled`.
    pub async fn load(&self) -> InstallResult<bool> {
        let Some(saved) = self.ctx.deps.store.load().await? else {
            return Ok(false);
        };
        validate_settings(&saved.settings)?;
        *self
            .ctx
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = saved.settings;

        let registry = &self.ctx.registry;
        for record in saved.engines {
            if registry.find_by_path(EntityKind::Engine, &record.path).is_some() {
                continue;
            }
            let mut state = InstallationState::from(record.state);
            if state == InstallationState::Installed && !record.path.is_dir() {
                warn!(path = %record.path.display(), "installed engine directory is missing");
                state = InstallationState::NotInstalled;
            }
            let mut entity = InstallableEntity::engine(record.id, record.path).with_state(state);
            entity.details = EntityDetails::Engine {
                id: record.id,
                commit_id: record.commit_id,
            };
            registry.insert(entity);
        }

        for record in saved.projects {
            if registry.find_by_path(EntityKind::Project, &record.path).is_some() {
                continue;
            }
            let mut entity = InstallableEntity::project(record.name, record.path, record.engine_id)
                .with_state(InstallationState::Installed);
            entity.details = EntityDetails::Project {
                engine_id: record.engine_id,
                include_source_code: record.include_source_code,
                build_dir: record.build_dir,
            };
            registry.insert(entity);
        }

        let counts = registry.counts();
        info!(engines = counts.engines, projects = counts.projects, "launcher state loaded");
        Ok(true)
    }
}
