//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the orchestrator expects from infrastructure:
//! version control, process spawning, persistence, the remote catalog and
//! event delivery. They contain no implementation details.

pub mod catalog;
pub mod events;
pub mod process_runner;
pub mod store;
pub mod transfer;

use thiserror::Error;

pub use catalog::{Catalog, CatalogEntry, CatalogSource};
pub use events::{InstallEvent, InstallEventEmitter, PipelineKind, PipelineOutcome};
pub use process_runner::{CommandSpec, ProcessRunner, RunOptions, RunOutcome};
pub use store::{EngineRecord, LauncherState, LauncherStore, ProjectRecord};
pub use transfer::{CloneOutcome, RemoteTransfer, TransferError, TransferObserver};

/// Errors from spawning and supervising external processes.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The OS could not create the process.
    #[error("Failed to start {program}: {reason}")]
    StartFailed { program: String, reason: String },

    /// The program could not be located.
    #[error("Program not found: {0}")]
    NotFound(String),

    /// Waiting on or signalling the process failed.
    #[error("Process I/O error: {0}")]
    Io(String),
}

impl ProcessError {
    pub fn start_failed(program: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::StartFailed {
            program: program.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from the launcher state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors from fetching or reading the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Request(String),

    #[error("Catalog is malformed: {0}")]
    Malformed(String),

    #[error("Catalog cache error: {0}")]
    Cache(String),
}
