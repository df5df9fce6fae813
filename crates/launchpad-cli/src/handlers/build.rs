//! Build and delete handlers.

use launchpad_core::{BuildConfiguration, EntityKind};

use super::{await_pipeline, resolve};
use crate::bootstrap::CliContext;
use crate::error::CliError;

const BUILDABLE: [EntityKind; 2] = [EntityKind::Engine, EntityKind::Project];
const DELETABLE: [EntityKind; 4] = [
    EntityKind::Engine,
    EntityKind::Project,
    EntityKind::Plugin,
    EntityKind::Template,
];

/// Build an engine or project. `config` narrows the build to one configuration.
pub async fn execute(
    ctx: &CliContext,
    name: &str,
    config: Option<BuildConfiguration>,
) -> Result<(), CliError> {
    let handle = resolve(ctx, &BUILDABLE, name)?;
    let entity = ctx.orchestrator().get(handle)?;
    if !entity.path.exists() {
        println!("{name}: {} does not exist, nothing to build", entity.path.display());
        return Ok(());
    }
    ctx.orchestrator().request_build(handle, config)?;
    await_pipeline(ctx, handle, name).await
}

pub async fn delete(ctx: &CliContext, name: &str, remove: bool) -> Result<(), CliError> {
    let handle = resolve(ctx, &DELETABLE, name)?;
    let entity = ctx.orchestrator().get(handle)?;
    if !entity.path.exists() {
        if remove {
            ctx.orchestrator().remove_entity(handle)?;
            ctx.orchestrator().save().await?;
            println!("{name}: removed from list");
        } else {
            println!("{name}: {} does not exist, nothing to delete", entity.path.display());
        }
        return Ok(());
    }
    ctx.orchestrator().request_delete(handle, remove)?;
    await_pipeline(ctx, handle, name).await
}
