//! Installation orchestrator for launchpad.
//!
//! Runs the Download, Build and Delete pipelines for engine instances,
//! plugins, templates and projects on a background task queue, with one
//! registry as the gateway for every entity read and write.
#![deny(unused_crate_dependencies)]

pub mod artifacts;
mod orchestrator;
pub mod queue;
pub mod registry;
mod tree;

pub use artifacts::{ArtifactReport, copy_artifacts};
pub use orchestrator::{
    CatalogSyncReport, DiscoveryReport, InstallationOrchestrator, LauncherDirs, OrchestratorDeps,
    ProjectFile,
};
pub use queue::TaskQueue;
pub use registry::{EntityRegistry, InstallCounts};

#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use zip as _;
