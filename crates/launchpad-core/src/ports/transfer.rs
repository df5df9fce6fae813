//! Remote transfer port.
//!
//! The orchestrator needs three things from version control: a recursive
//! clone that reports progress and honours cancellation, a way to request
//! that cancellation, and the revision currently checked out.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::TransferUpdate;

/// Terminal result of one clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum CloneOutcome {
    Completed,
    Canceled,
    Failed(String),
}

impl CloneOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Not a working tree: {0}")]
    NotARepository(String),

    #[error("Version control tool unavailable: {0}")]
    ToolMissing(String),

    #[error("Transfer command failed: {0}")]
    Command(String),
}

/// Receives incremental clone progress.
pub trait TransferObserver: Send + Sync {
    fn on_progress(&self, update: TransferUpdate);
}

impl<F> TransferObserver for F
where
    F: Fn(TransferUpdate) + Send + Sync,
{
    fn on_progress(&self, update: TransferUpdate) {
        self(update);
    }
}

#[async_trait]
pub trait RemoteTransfer: Send + Sync {
    /// Clone `url` into `dest`, including nested dependent trees.
    ///
    /// Must observe `cancel` at bounded intervals and return
    /// [`CloneOutcome::Canceled`] once it fires. Does not clean up `dest`;
    /// partial output is the caller's to remove.
    async fn clone_recursive(
        &self,
        url: &str,
        dest: &Path,
        observer: &dyn TransferObserver,
        cancel: &CancellationToken,
    ) -> CloneOutcome;

    /// Request cancellation of a running clone. Only sets the signal.
    fn cancel(&self, cancel: &CancellationToken) {
        cancel.cancel();
    }

    /// Revision identifier of the working tree at `path`.
    async fn current_commit_id(&self, path: &Path) -> Result<String, TransferError>;
}
