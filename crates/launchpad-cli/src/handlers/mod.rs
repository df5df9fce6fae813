//! Command handlers.
//!
//! Handlers follow one pattern:
//! `pub async fn execute(ctx: &CliContext, ...) -> Result<(), CliError>`.
//! They resolve names to handles, call the orchestrator, and for queued
//! pipelines wait for the outcome while rendering progress.

pub mod build;
pub mod catalog;
pub mod engine;
pub mod list;
pub mod paths;
pub mod project;
pub mod settings;

use launchpad_core::{EntityHandle, EntityKind, PipelineOutcome};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::watch;

/// Resolve `name` among entities of `kinds`, in order.
pub(crate) fn resolve(
    ctx: &CliContext,
    kinds: &[EntityKind],
    name: &str,
) -> Result<EntityHandle, CliError> {
    kinds
        .iter()
        .find_map(|kind| ctx.orchestrator().find(*kind, name))
        .ok_or_else(|| CliError::UnknownEntity {
            kind: kinds.first().map_or("entity", |k| k.as_str()),
            name: name.to_string(),
        })
}

/// Wait for the queued pipeline of `handle` and report how it ended.
pub(crate) async fn await_pipeline(
    ctx: &CliContext,
    handle: EntityHandle,
    name: &str,
) -> Result<(), CliError> {
    let entity = watch(ctx.orchestrator(), handle, name).await?;
    match ctx.outcomes.take(handle) {
        Some(PipelineOutcome::Failed { reason }) => Err(CliError::PipelineFailed {
            name: name.to_string(),
            reason,
        }),
        Some(PipelineOutcome::Canceled) => {
            println!("{name}: canceled");
            Ok(())
        }
        Some(PipelineOutcome::Abandoned) => {
            println!("{name}: removed while running");
            Ok(())
        }
        Some(PipelineOutcome::Succeeded) | None => {
            match entity {
                Some(entity) => println!("{name}: {}", entity.state),
                None => println!("{name}: removed"),
            }
            Ok(())
        }
    }
}
