//! Catalog sync and plugin/template install handlers.

use launchpad_core::{EntityKind, InstallationState};

use super::{await_pipeline, resolve};
use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn sync(ctx: &CliContext) -> Result<(), CliError> {
    let report = ctx.orchestrator().sync_catalog().await?;
    if !report.refreshed {
        println!("Catalog unreachable, using the cached copy.");
    }
    println!(
        "{} new plugin(s), {} new template(s), {} template(s) updated",
        report.plugins_added, report.templates_added, report.templates_updated
    );
    Ok(())
}

/// Download a catalog plugin or template into the launcher data directory.
///
/// Syncs the catalog first when `name` is not known yet.
pub async fn install(ctx: &CliContext, kind: EntityKind, name: &str) -> Result<(), CliError> {
    let orchestrator = ctx.orchestrator();
    if orchestrator.find(kind, name).is_none() {
        orchestrator.sync_catalog().await?;
    }
    let handle = resolve(ctx, &[kind], name)?;
    let entity = orchestrator.get(handle)?;
    if entity.state == InstallationState::Installed {
        println!("{name} is already installed at {}", entity.path.display());
        return Ok(());
    }
    orchestrator.request_download(handle)?;
    await_pipeline(ctx, handle, name).await
}
