//! Engine command handlers.

use std::path::Path;

use launchpad_core::InstallationState;

use super::await_pipeline;
use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Register `dir` as an engine checkout, or as the parent of one to download.
pub async fn add(ctx: &CliContext, dir: &Path) -> Result<(), CliError> {
    let handle = ctx.orchestrator().attach_engine_directory(dir).await?;
    let engine = ctx.orchestrator().get(handle)?;
    println!("{} at {} ({})", engine.name, engine.path.display(), engine.state);
    Ok(())
}

/// Download an engine into `<dir>/HydraEngine` and wait for it.
pub async fn download(ctx: &CliContext, dir: &Path) -> Result<(), CliError> {
    let orchestrator = ctx.orchestrator();
    let handle = orchestrator.attach_engine_directory(dir).await?;
    let engine = orchestrator.get(handle)?;
    if engine.state == InstallationState::Installed {
        println!("{} is already installed at {}", engine.name, engine.path.display());
        return Ok(());
    }

    orchestrator.request_download(handle)?;
    await_pipeline(ctx, handle, &engine.name).await
}
