//! Delete pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use launchpad_core::{
    EntityDetails, EntityHandle, InstallError, InstallEvent, InstallResult, InstallationState,
    PipelineKind, PipelineOutcome,
};
use tracing::{debug, error, info};

use super::{Context, InstallationOrchestrator};
use crate::tree;

impl InstallationOrchestrator {
    /// Queue the Delete pipeline: remove the entity's files, then either
    /// drop it from the list or reset it to `NotInstalled`.
    ///
    /// Does nothing when the entity's directory is missing.
    pub fn request_delete(&self, handle: EntityHandle, remove_from_list: bool) -> InstallResult<()> {
        let ctx = &self.ctx;
        let entity = ctx.registry.get(handle)?;
        if !entity.path.exists() {
            debug!(entity = %entity.name, path = %entity.path.display(), "delete skipped: path does not exist");
            return Ok(());
        }

        // Wait only marks the entity busy; nothing observes the token.
        let (_cancel, entity) = ctx.begin(handle, InstallationState::Wait, 1, |_| Ok(()))?;
        info!(entity = %entity.name, path = %entity.path.display(), remove_from_list, "delete queued");

        let task_ctx = Arc::clone(ctx);
        let name = entity.name.clone();
        let path = entity.path;
        ctx.spawn_pipeline(handle, entity.name, PipelineKind::Delete, async move {
            run_delete(&task_ctx, handle, &name, path, remove_from_list).await;
        });
        Ok(())
    }
}

async fn run_delete(
    ctx: &Context,
    handle: EntityHandle,
    name: &str,
    path: PathBuf,
    remove_from_list: bool,
) {
    const PIPELINE: PipelineKind = PipelineKind::Delete;

    if ctx.set_step(handle, "Deleting files").is_err() {
        ctx.abandon(handle, name, PIPELINE);
        return;
    }

    let target = path.clone();
    let removed = tree::blocking(move || {
        tree::remove_tree(&target).map_err(|e| InstallError::io(target.display(), e))
    })
    .await;

    match removed {
        Err(err) => {
            error!(entity = %name, path = %path.display(), error = %err, "delete failed");
            ctx.finish(
                handle,
                name,
                PIPELINE,
                InstallationState::Failed,
                PipelineOutcome::Failed {
                    reason: err.to_string(),
                },
            );
        }
        Ok(()) if remove_from_list => match ctx.registry.remove(handle) {
            Ok(_) => {
                info!(entity = %name, "deleted and removed from list");
                ctx.emit(InstallEvent::PipelineFinished {
                    handle,
                    name: name.to_string(),
                    pipeline: PIPELINE,
                    outcome: PipelineOutcome::Succeeded,
                });
            }
            Err(_) => ctx.abandon(handle, name, PIPELINE),
        },
        Ok(()) => {
            let cleared = ctx.registry.update(handle, |e| {
                if let EntityDetails::Engine { commit_id, .. } = &mut e.details {
                    *commit_id = None;
                }
                e.progress.complete_step();
            });
            if cleared.is_ok() {
                ctx.finish(
                    handle,
                    name,
                    PIPELINE,
                    InstallationState::NotInstalled,
                    PipelineOutcome::Succeeded,
                );
            } else {
                ctx.abandon(handle, name, PIPELINE);
            }
        }
    }
    ctx.persist().await;
}
