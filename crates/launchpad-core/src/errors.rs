//! Install error taxonomy shared by the orchestrator and its front ends.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{EntityHandle, InstallationState};
use crate::paths::PathError;
use crate::ports::{CatalogError, ProcessError, StoreError};
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum InstallError {
    /// Network or remote error during a clone.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// User-initiated; not an error for display purposes.
    #[error("Transfer canceled")]
    TransferCanceled,

    /// Cancel observed between or during build steps.
    #[error("Build canceled")]
    BuildCanceled,

    /// Generator or compiler not found.
    #[error("Build tool missing: {0}")]
    BuildToolMissing(String),

    #[error("Build invocation failed: {command}: {reason}")]
    BuildInvocationFailed { command: String, reason: String },

    /// The generator ran but produced no solution.
    #[error("Generator produced no solution at {0}")]
    SolutionMissing(PathBuf),

    #[error("Path does not exist: {0}")]
    PathMissing(PathBuf),

    #[error("Failed to remove partial install at {path}: {reason}")]
    PartialInstallCleanup { path: PathBuf, reason: String },

    /// Another pipeline already owns the entity.
    #[error("{name} is busy ({state})")]
    Busy {
        name: String,
        state: InstallationState,
    },

    /// The entity was removed; its handle no longer resolves.
    #[error("Entity {0} no longer exists")]
    Stale(EntityHandle),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported for this entity: {0}")]
    Unsupported(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub type InstallResult<T> = Result<T, InstallError>;

impl InstallError {
    pub fn io(context: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self::Io(format!("{context}: {err}"))
    }

    pub fn build_failed(command: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::BuildInvocationFailed {
            command: command.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn busy(name: impl Into<String>, state: InstallationState) -> Self {
        Self::Busy {
            name: name.into(),
            state,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::TransferCanceled | Self::BuildCanceled)
    }

    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

impl From<std::io::Error> for InstallError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
