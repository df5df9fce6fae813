//! Persistence port for launcher state.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::domain::{EngineId, PersistedState};
use crate::settings::Settings;

/// An engine instance as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRecord {
    pub id: EngineId,
    pub path: PathBuf,
    pub state: PersistedState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

/// A project as written to disk, with its engine linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub include_source_code: bool,
    #[serde(default)]
    pub engine_id: Option<EngineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
}

/// Everything that survives a restart.
///
/// Plugins and templates are not stored: they are rediscovered from their
/// directories and the catalog on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherState {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub engines: Vec<EngineRecord>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

#[async_trait]
pub trait LauncherStore: Send + Sync {
    /// Load saved state. `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<LauncherState>, StoreError>;

    async fn save(&self, state: &LauncherState) -> Result<(), StoreError>;
}
