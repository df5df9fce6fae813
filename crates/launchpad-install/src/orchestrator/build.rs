//! Build pipeline.
//!
//! Generates the solution when it is missing, runs the build tool once per
//! configuration, then (for projects) stages the artifacts and performs the
//! post-build actions from settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use launchpad_core::layout;
use launchpad_core::{
    BuildConfiguration, CancellationToken, CommandSpec, EntityDetails, EntityHandle, InstallError,
    InstallResult, InstallableEntity, InstallationState, PipelineKind, PipelineOutcome,
    ProcessError, RunOptions, RunOutcome, Settings,
};
use launchpad_runtime::{directory_opener, find_build_tool};
use tracing::{debug, error, info, warn};

use super::{Context, InstallationOrchestrator};
use crate::artifacts;
use crate::tree;

/// How build sub-steps show up in the progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StepReporting {
    /// Each sub-step is one pipeline step.
    Steps,
    /// The build is a single step of a longer pipeline; sub-steps advance
    /// that step's fraction.
    Nested,
}

struct StepReporter {
    mode: StepReporting,
    done: u32,
    total: u32,
}

impl StepReporter {
    const fn new(mode: StepReporting, total: u32) -> Self {
        Self {
            mode,
            done: 0,
            total,
        }
    }

    fn advance(&mut self, ctx: &Context, handle: EntityHandle) -> InstallResult<()> {
        self.done += 1;
        match self.mode {
            StepReporting::Steps => ctx.complete_step(handle),
            StepReporting::Nested => ctx.report_substeps(handle, self.done, self.total),
        }
    }
}

/// Number of progress steps a build over `configs` takes.
pub(super) fn build_steps(configs: &[BuildConfiguration]) -> u32 {
    u32::try_from(configs.len())
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

/// Where a project's build lands, for staging and post-build actions.
#[derive(Debug, Clone)]
struct ProjectOutput {
    name: String,
    path: PathBuf,
    build_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct BuildTarget {
    solution: PathBuf,
    generator: CommandSpec,
    project: Option<ProjectOutput>,
}

fn generator_command(engine: &Path, descriptor: &Path, settings: &Settings) -> CommandSpec {
    CommandSpec::new(layout::generator_executable(engine))
        .arg(format!("--file={}", descriptor.display()))
        .arg(settings.effective_generator_target())
        .current_dir(layout::generator_dir(engine))
}

fn resolve_target(
    ctx: &Context,
    entity: &InstallableEntity,
    settings: &Settings,
) -> InstallResult<BuildTarget> {
    match &entity.details {
        EntityDetails::Engine { .. } => Ok(BuildTarget {
            solution: layout::engine_solution(&entity.path),
            generator: generator_command(
                &entity.path,
                &layout::engine_descriptor(&entity.path),
                settings,
            ),
            project: None,
        }),
        EntityDetails::Project {
            engine_id,
            include_source_code,
            build_dir,
        } => {
            let engine = engine_id
                .and_then(|id| ctx.registry.find_engine(id))
                .or_else(|| ctx.registry.first_engine())
                .map(|(_, engine)| engine)
                .ok_or_else(|| {
                    InstallError::NotFound(format!("no engine available to build {}", entity.name))
                })?;
            if let Some(id) = engine_id
                && engine.engine_id() != Some(*id)
            {
                warn!(project = %entity.name, linked = %id, using = %engine.name, "linked engine missing, using first engine");
            }

            let generator = generator_command(
                &engine.path,
                &layout::project_descriptor(&entity.path),
                settings,
            )
            .arg(format!("--enginePath={}", engine.path.display()))
            .arg(format!("--includeSourceCode={include_source_code}"));

            Ok(BuildTarget {
                solution: layout::project_solution(&entity.path, &entity.name),
                generator,
                project: Some(ProjectOutput {
                    name: entity.name.clone(),
                    path: entity.path.clone(),
                    build_dir: build_dir.clone(),
                }),
            })
        }
        EntityDetails::Plugin { .. } | EntityDetails::Template { .. } => Err(
            InstallError::Unsupported(format!("{} cannot be built", entity.kind())),
        ),
    }
}

/// Run one external step. A nonzero exit is logged and only fails the
/// build when `fail_on_error` is set.
async fn run_step(
    ctx: &Context,
    command: &CommandSpec,
    options: RunOptions,
    cancel: &CancellationToken,
    fail_on_error: bool,
) -> InstallResult<()> {
    debug!(command = %command, "running build step");
    let outcome = ctx
        .deps
        .runner
        .run(command, options, cancel)
        .await
        .map_err(|e| match e {
            ProcessError::NotFound(program) => InstallError::BuildToolMissing(program),
            other => InstallError::build_failed(command, other),
        })?;

    match outcome {
        RunOutcome::Killed => Err(InstallError::BuildCanceled),
        RunOutcome::Exited { code: Some(0) } => Ok(()),
        RunOutcome::Exited { code } => {
            let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            warn!(command = %command, exit = %code, "build step reported errors");
            if fail_on_error {
                Err(InstallError::build_failed(command, format!("exited with {code}")))
            } else {
                Ok(())
            }
        }
    }
}

/// Every build stage after admission. Shared by standalone builds and
/// builds chained from a download.
pub(super) async fn run_build(
    ctx: &Context,
    handle: EntityHandle,
    configs: &[BuildConfiguration],
    settings: &Settings,
    cancel: &CancellationToken,
    reporting: StepReporting,
) -> InstallResult<()> {
    let entity = ctx.registry.get(handle)?;
    let target = resolve_target(ctx, &entity, settings)?;
    let fail_on_error = settings.effective_fail_on_build_errors();
    let show_output = settings.effective_show_build_output();
    let options = RunOptions::default()
        .with_show_window(show_output)
        .with_forward_output(show_output);
    let mut steps = StepReporter::new(reporting, build_steps(configs));

    let tool = find_build_tool(settings.build_tool.as_deref())?;

    ctx.set_step(handle, "Generating project files")?;
    if !target.solution.is_file() {
        if cancel.is_cancelled() {
            return Err(InstallError::BuildCanceled);
        }
        run_step(ctx, &target.generator, options, cancel, false).await?;
        if !target.solution.is_file() {
            error!(entity = %entity.name, solution = %target.solution.display(), "generator produced no solution");
            return Err(InstallError::SolutionMissing(target.solution));
        }
    }
    steps.advance(ctx, handle)?;

    let mut staged = None;
    for &config in configs {
        if cancel.is_cancelled() {
            return Err(InstallError::BuildCanceled);
        }
        ctx.set_step(handle, format!("Building {config}"))?;

        let mut command = CommandSpec::new(&tool)
            .arg(target.solution.display().to_string())
            .arg(format!("/p:Configuration={config}"))
            .arg("/verbosity:minimal");
        if let Some(dir) = tool.parent() {
            command = command.current_dir(dir);
        }
        run_step(ctx, &command, options, cancel, fail_on_error).await?;

        if let Some(project) = &target.project {
            staged = stage_artifacts(project, config, fail_on_error).await?.or(staged);
        }
        steps.advance(ctx, handle)?;
    }

    if let (Some(project), Some(output)) = (&target.project, staged) {
        after_build(ctx, project, &output, settings).await;
    }
    Ok(())
}

async fn stage_artifacts(
    project: &ProjectOutput,
    config: BuildConfiguration,
    fail_on_error: bool,
) -> InstallResult<Option<PathBuf>> {
    let output = layout::project_output_dir(&project.path, project.build_dir.as_deref(), config);
    let (source, dest) = (project.path.clone(), output.clone());
    match tree::blocking(move || artifacts::copy_artifacts(&source, &dest, config)).await {
        Ok(report) => {
            debug!(
                project = %project.name,
                %config,
                binaries = report.binaries,
                plugins = report.plugins,
                "artifacts staged"
            );
            Ok(Some(output))
        }
        Err(err) if fail_on_error => Err(err),
        Err(err) => {
            warn!(project = %project.name, %config, error = %err, "artifacts not staged");
            Ok(None)
        }
    }
}

async fn after_build(ctx: &Context, project: &ProjectOutput, output: &Path, settings: &Settings) {
    if settings.effective_open_output_dir() && output.is_dir() {
        let open = CommandSpec::new(directory_opener()).arg(output.display().to_string());
        if let Err(err) = ctx.deps.runner.launch_detached(&open).await {
            warn!(path = %output.display(), error = %err, "could not open output directory");
        }
    }

    if settings.effective_run_after_build() {
        let executable = layout::project_executable(output, &project.name);
        if !executable.is_file() {
            debug!(path = %executable.display(), "no executable to launch");
            return;
        }
        let launch = CommandSpec::new(&executable).current_dir(output);
        match ctx.deps.runner.launch_detached(&launch).await {
            Ok(()) => info!(project = %project.name, "launched build"),
            Err(err) => warn!(project = %project.name, error = %err, "could not launch build"),
        }
    }
}

impl InstallationOrchestrator {
    /// Queue the Build pipeline for an engine or project.
    ///
    /// `config` builds one configuration; `None` builds every configuration
    /// from settings. Does nothing when the entity's directory is missing.
    pub fn request_build(
        &self,
        handle: EntityHandle,
        config: Option<BuildConfiguration>,
    ) -> InstallResult<()> {
        let ctx = &self.ctx;
        let entity = ctx.registry.get(handle)?;
        if !entity.kind().is_buildable() {
            return Err(InstallError::Unsupported(format!(
                "{} is a {} and cannot be built",
                entity.name,
                entity.kind()
            )));
        }
        if !entity.path.exists() {
            debug!(entity = %entity.name, path = %entity.path.display(), "build skipped: path does not exist");
            return Ok(());
        }

        let settings = ctx.settings();
        let configs = config.map_or_else(|| settings.effective_build_configurations(), |c| vec![c]);
        let (cancel, entity) = ctx.begin(handle, InstallationState::Build, build_steps(&configs), |e| {
            match e.state {
                InstallationState::Installed | InstallationState::Failed => Ok(()),
                state => Err(InstallError::Invalid(format!(
                    "{} is {state}; it must be installed before building",
                    e.name
                ))),
            }
        })?;
        info!(entity = %entity.name, configs = configs.len(), "build queued");

        let task_ctx = Arc::clone(ctx);
        let name = entity.name.clone();
        ctx.spawn_pipeline(handle, entity.name, PipelineKind::Build, async move {
            let result =
                run_build(&task_ctx, handle, &configs, &settings, &cancel, StepReporting::Steps).await;
            let (state, outcome) = match result {
                Ok(()) => (InstallationState::Installed, PipelineOutcome::Succeeded),
                Err(err) if err.is_stale() => {
                    task_ctx.abandon(handle, &name, PipelineKind::Build);
                    return;
                }
                // The source tree is intact.
                Err(err) if err.is_cancelled() => {
                    (InstallationState::Installed, PipelineOutcome::Canceled)
                }
                Err(err) => {
                    error!(entity = %name, error = %err, "build failed");
                    (
                        InstallationState::Failed,
                        PipelineOutcome::Failed {
                            reason: err.to_string(),
                        },
                    )
                }
            };
            task_ctx.finish(handle, &name, PipelineKind::Build, state, outcome);
            task_ctx.persist().await;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_steps_count_generator_and_configs() {
        assert_eq!(build_steps(&BuildConfiguration::ALL), 5);
        assert_eq!(build_steps(&[BuildConfiguration::Debug]), 2);
    }

    #[cfg(unix)]
    #[test]
    fn generator_runs_from_its_own_directory() {
        let engine = Path::new("/opt/HydraEngine");
        let cmd = generator_command(
            engine,
            &layout::engine_descriptor(engine),
            &Settings::with_defaults(),
        );
        assert_eq!(cmd.working_dir(), Some(layout::generator_dir(engine).as_path()));
        assert_eq!(cmd.args, vec!["--file=/opt/HydraEngine/premake.lua", "vs2022"]);
    }
}
