//! Download pipeline.
//!
//! Clones each remote part of an entity in order, records the engine
//! revision, unpacks bundled archives and, for engines with auto-build on,
//! chains straight into the build. Canceled or failed downloads remove
//! everything they wrote before the state is finalized.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use launchpad_core::layout;
use launchpad_core::{
    BuildConfiguration, CancellationToken, CloneOutcome, DirectoryCreationStrategy,
    EntityDetails, EntityHandle, EntityKind, InstallError, InstallResult, InstallableEntity,
    InstallationState, PipelineKind, PipelineOutcome, Settings, ensure_directory,
};
use launchpad_runtime::{extract_archive, find_archives};
use tracing::{debug, error, info, warn};

use super::build::{self, StepReporting};
use super::observer::RegistryObserver;
use super::{Context, InstallationOrchestrator};
use crate::tree;

#[derive(Debug, Clone)]
struct TransferPart {
    label: &'static str,
    url: String,
    dest: PathBuf,
    /// Unpack and delete top-level `.zip` files once cloned.
    extract_archives: bool,
}

#[derive(Debug, Clone)]
struct DownloadPlan {
    root: PathBuf,
    parts: Vec<TransferPart>,
    chain_build: Option<Vec<BuildConfiguration>>,
}

impl DownloadPlan {
    fn for_entity(entity: &InstallableEntity, settings: &Settings) -> InstallResult<Self> {
        let root = entity.path.clone();
        match entity.kind() {
            EntityKind::Engine => {
                let url = entity
                    .source_url
                    .clone()
                    .unwrap_or_else(|| settings.effective_engine_repo_url().to_string());
                let parts = vec![
                    TransferPart {
                        label: "engine",
                        url,
                        dest: root.clone(),
                        extract_archives: false,
                    },
                    TransferPart {
                        label: "engine libraries",
                        url: settings.effective_engine_libs_repo_url().to_string(),
                        dest: layout::engine_libs_dir(&root),
                        extract_archives: true,
                    },
                ];
                let chain_build = settings
                    .effective_auto_build()
                    .then(|| settings.effective_build_configurations());
                Ok(Self {
                    root,
                    parts,
                    chain_build,
                })
            }
            kind @ (EntityKind::Plugin | EntityKind::Template) => {
                let url = entity.source_url.clone().ok_or_else(|| {
                    InstallError::Invalid(format!("{} has no source URL", entity.name))
                })?;
                Ok(Self {
                    parts: vec![TransferPart {
                        label: kind.as_str(),
                        url,
                        dest: root.clone(),
                        extract_archives: false,
                    }],
                    root,
                    chain_build: None,
                })
            }
            EntityKind::Project => Err(InstallError::Unsupported(format!(
                "{} is a local project and cannot be downloaded",
                entity.name
            ))),
        }
    }

    fn total_steps(&self) -> u32 {
        let parts = u32::try_from(self.parts.len()).unwrap_or(u32::MAX);
        parts.saturating_add(u32::from(self.chain_build.is_some()))
    }
}

/// The destination must sit in an existing directory and must not already
/// hold files. Plugin and template roots are created on demand.
fn check_destination(kind: EntityKind, root: &Path) -> InstallResult<()> {
    let parent = root
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| InstallError::Invalid(format!("{} has no parent directory", root.display())))?;

    match kind {
        EntityKind::Plugin | EntityKind::Template => {
            ensure_directory(parent, DirectoryCreationStrategy::AutoCreate)?;
        }
        _ if !parent.is_dir() => {
            warn!(path = %root.display(), "download refused: parent directory does not exist");
            return Err(InstallError::PathMissing(parent.to_path_buf()));
        }
        _ => {}
    }

    if root.is_file() {
        return Err(InstallError::Invalid(format!("{} is a file", root.display())));
    }
    if tree::is_non_empty_dir(root).map_err(|e| InstallError::io(root.display(), e))? {
        return Err(InstallError::Invalid(format!(
            "{} already exists and is not empty",
            root.display()
        )));
    }
    Ok(())
}

impl InstallationOrchestrator {
    /// Queue the Download pipeline for `handle`.
    ///
    /// Accepted from `NotInstalled` and `Failed`.
    pub fn request_download(&self, handle: EntityHandle) -> InstallResult<()> {
        let ctx = &self.ctx;
        let entity = ctx.registry.get(handle)?;
        if entity.state.is_active() {
            return Err(InstallError::busy(entity.name, entity.state));
        }
        let settings = ctx.settings();
        let plan = DownloadPlan::for_entity(&entity, &settings)?;
        check_destination(entity.kind(), &plan.root)?;

        let total_steps = plan.total_steps();
        let (cancel, entity) = ctx.begin(handle, InstallationState::Installing, total_steps, |e| {
            match e.state {
                InstallationState::NotInstalled | InstallationState::Failed => Ok(()),
                state => Err(InstallError::Invalid(format!("{} is already {state}", e.name))),
            }
        })?;
        info!(
            entity = %entity.name,
            path = %plan.root.display(),
            steps = total_steps,
            "download queued"
        );

        let task_ctx = Arc::clone(ctx);
        let name = entity.name.clone();
        ctx.spawn_pipeline(handle, entity.name, PipelineKind::Download, async move {
            run_download(&task_ctx, handle, &name, &plan, &settings, &cancel).await;
        });
        Ok(())
    }
}

async fn run_download(
    ctx: &Context,
    handle: EntityHandle,
    name: &str,
    plan: &DownloadPlan,
    settings: &Settings,
    cancel: &CancellationToken,
) {
    const PIPELINE: PipelineKind = PipelineKind::Download;

    if let Err(err) = fetch_parts(ctx, handle, plan, cancel).await {
        let (state, outcome) = discard_partial(&plan.root, &err).await;
        if err.is_stale() {
            ctx.abandon(handle, name, PIPELINE);
        } else {
            ctx.finish(handle, name, PIPELINE, state, outcome);
        }
        ctx.persist().await;
        return;
    }

    if let Err(err) = super::catalog::refresh_metadata(ctx, handle).await {
        debug!(entity = %name, error = %err, "descriptor not refreshed");
    }

    let Some(configs) = plan.chain_build.as_deref() else {
        ctx.finish(
            handle,
            name,
            PIPELINE,
            InstallationState::Installed,
            PipelineOutcome::Succeeded,
        );
        ctx.persist().await;
        return;
    };

    let built = async {
        ctx.transition(handle, InstallationState::Build)?;
        build::run_build(ctx, handle, configs, settings, cancel, StepReporting::Nested).await?;
        ctx.complete_step(handle)
    }
    .await;

    match built {
        Ok(()) => ctx.finish(
            handle,
            name,
            PIPELINE,
            InstallationState::Installed,
            PipelineOutcome::Succeeded,
        ),
        Err(err) if err.is_stale() => ctx.abandon(handle, name, PIPELINE),
        Err(err) if err.is_cancelled() => {
            let (state, outcome) = discard_partial(&plan.root, &err).await;
            ctx.finish(handle, name, PIPELINE, state, outcome);
        }
        Err(err) => {
            error!(entity = %name, error = %err, "build after download failed");
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
    }
    ctx.persist().await;
}

async fn fetch_parts(
    ctx: &Context,
    handle: EntityHandle,
    plan: &DownloadPlan,
    cancel: &CancellationToken,
) -> InstallResult<()> {
    for (index, part) in plan.parts.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(InstallError::TransferCanceled);
        }
        ctx.set_step(handle, format!("Cloning {}", part.label))?;
        if let Some(parent) = part.dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallError::io(parent.display(), e))?;
        }

        debug!(url = %part.url, dest = %part.dest.display(), "cloning");
        let observer = RegistryObserver::new(ctx, handle);
        match ctx
            .deps
            .transfer
            .clone_recursive(&part.url, &part.dest, &observer, cancel)
            .await
        {
            CloneOutcome::Completed => {}
            CloneOutcome::Canceled => return Err(InstallError::TransferCanceled),
            CloneOutcome::Failed(reason) => return Err(InstallError::TransferFailed(reason)),
        }

        if index == 0 {
            record_revision(ctx, handle, &part.dest).await?;
        }
        if part.extract_archives {
            unpack_archives(ctx, handle, &part.dest, cancel).await?;
        }
        ctx.complete_step(handle)?;
    }
    Ok(())
}

async fn record_revision(ctx: &Context, handle: EntityHandle, path: &Path) -> InstallResult<()> {
    if ctx.registry.with(handle, InstallableEntity::kind)? != EntityKind::Engine {
        return Ok(());
    }
    match ctx.deps.transfer.current_commit_id(path).await {
        Ok(revision) => {
            debug!(path = %path.display(), %revision, "recorded revision");
            ctx.registry.update(handle, |e| {
                if let EntityDetails::Engine { commit_id, .. } = &mut e.details {
                    *commit_id = Some(revision);
                }
            })
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read revision");
            Ok(())
        }
    }
}

async fn unpack_archives(
    ctx: &Context,
    handle: EntityHandle,
    dir: &Path,
    cancel: &CancellationToken,
) -> InstallResult<()> {
    let archives = find_archives(dir).map_err(|e| InstallError::io(dir.display(), e))?;
    for archive in archives {
        if cancel.is_cancelled() {
            return Err(InstallError::TransferCanceled);
        }
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ctx.set_step(handle, format!("Extracting {file_name}"))?;

        let files = extract_archive(&archive, dir)
            .await
            .map_err(|e| InstallError::io(archive.display(), e))?;
        tokio::fs::remove_file(&archive)
            .await
            .map_err(|e| InstallError::io(archive.display(), e))?;
        debug!(archive = %file_name, files, "unpacked archive");
    }
    Ok(())
}

/// Remove partial output and map the error to the pipeline's final state.
async fn discard_partial(
    root: &Path,
    err: &InstallError,
) -> (InstallationState, PipelineOutcome) {
    let target = root.to_path_buf();
    let cleanup = tree::blocking(move || {
        tree::remove_tree(&target).map_err(|e| InstallError::PartialInstallCleanup {
            path: target.clone(),
            reason: e.to_string(),
        })
    })
    .await;

    match cleanup {
        Err(cleanup_err) => {
            error!(path = %root.display(), error = %cleanup_err, "partial download left on disk");
            (
                InstallationState::Failed,
                PipelineOutcome::Failed {
                    reason: cleanup_err.to_string(),
                },
            )
        }
        Ok(()) if err.is_cancelled() => (InstallationState::NotInstalled, PipelineOutcome::Canceled),
        Ok(()) => {
            error!(path = %root.display(), error = %err, "download failed");
            (
                InstallationState::Failed,
                PipelineOutcome::Failed {
                    reason: err.to_string(),
                },
            )
        }
    }
}
