//! Project command handlers.

use std::path::{Path, PathBuf};

use launchpad_core::EntityKind;

use super::resolve;
use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn create(
    ctx: &CliContext,
    name: &str,
    template: &str,
    parent: &Path,
) -> Result<(), CliError> {
    let template = resolve(ctx, &[EntityKind::Template], template)?;
    let handle = ctx
        .orchestrator()
        .create_project(name, template, parent)
        .await?;
    let project = ctx.orchestrator().get(handle)?;
    println!("Created {} at {}", project.name, project.path.display());
    Ok(())
}

pub async fn add(ctx: &CliContext, dir: &Path) -> Result<(), CliError> {
    let handle = ctx.orchestrator().add_existing_project(dir).await?;
    let project = ctx.orchestrator().get(handle)?;
    println!("Added {} ({})", project.name, project.path.display());
    Ok(())
}

pub async fn set_build_dir(
    ctx: &CliContext,
    name: &str,
    dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let handle = resolve(ctx, &[EntityKind::Project], name)?;
    match &dir {
        Some(dir) => println!("{name}: output goes to {}", dir.display()),
        None => println!("{name}: output goes to the default Build/Out"),
    }
    ctx.orchestrator().set_project_build_dir(handle, dir).await?;
    Ok(())
}
