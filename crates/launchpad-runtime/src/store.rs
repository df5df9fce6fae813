//! JSON file store for launcher state.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use launchpad_core::{LauncherState, LauncherStore, StoreError};
use tracing::debug;

/// Stores [`LauncherState`] as pretty-printed JSON.
///
/// Writes go to a uniquely named sibling temp file first and are renamed
/// into place, so a crash mid-save never leaves a truncated state file and
/// concurrent saves never share a temp file.
#[derive(Debug, Clone)]
pub struct JsonLauncherStore {
    path: PathBuf,
}

impl JsonLauncherStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LauncherStore for JsonLauncherStore {
    async fn load(&self) -> Result<Option<LauncherState>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Storage(format!("{}: {e}", self.path.display()))),
        };

        let state = serde_json::from_str(&text)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", self.path.display())))?;
        Ok(Some(state))
    }

    async fn save(&self, state: &LauncherState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| StoreError::Storage(format!("save task failed: {e}")))??;

        debug!(path = %self.path.display(), engines = state.engines.len(), "saved launcher state");
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| StoreError::Storage(format!("{}: {e}", dir.display())))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".state-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| StoreError::Storage(format!("{}: {e}", dir.display())))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StoreError::Storage(format!("{}: {e}", tmp.path().display())))?;
    tmp.persist(path)
        .map_err(|e| StoreError::Storage(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}
