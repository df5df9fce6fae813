//! Install event emitter port.
//!
//! Pipelines publish state transitions, progress and completion through this
//! port so front ends can react without polling. Polling snapshots from the
//! registry remains the primary read path.

use serde::{Deserialize, Serialize};

use crate::domain::{EntityHandle, InstallationState, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Download,
    Build,
    Delete,
}

impl PipelineKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Build => "build",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Succeeded,
    Canceled,
    Failed { reason: String },
    /// The entity was removed while the pipeline ran.
    Abandoned,
}

/// Single discriminated union for everything a pipeline reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEvent {
    StateChanged {
        handle: EntityHandle,
        name: String,
        from: InstallationState,
        to: InstallationState,
    },
    Progress {
        handle: EntityHandle,
        progress: Progress,
    },
    PipelineFinished {
        handle: EntityHandle,
        name: String,
        pipeline: PipelineKind,
        outcome: PipelineOutcome,
    },
}

impl InstallEvent {
    #[must_use]
    pub const fn handle(&self) -> EntityHandle {
        match self {
            Self::StateChanged { handle, .. }
            | Self::Progress { handle, .. }
            | Self::PipelineFinished { handle, .. } => *handle,
        }
    }
}

/// Port for emitting install events.
///
/// Implementations must not block; buffer or drop instead.
pub trait InstallEventEmitter: Send + Sync {
    fn emit(&self, event: InstallEvent);
}

