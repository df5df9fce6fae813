//! Path utilities for launchpad data directories.
//!
//! The data root holds the launcher state file, the catalog cache, and the
//! default plugin and template directories.

mod error;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "LAUNCHPAD_DATA_DIR";

pub const STATE_FILE_NAME: &str = "state.json";
pub const CATALOG_CACHE_FILE_NAME: &str = "catalog.json";

/// Strategy for how to handle missing directories when ensuring they exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryCreationStrategy {
    /// Create directories automatically if they are missing.
    #[default]
    AutoCreate,
    /// Do not create directories; return an error if missing.
    Disallow,
}

/// Root directory for launcher data.
///
/// Resolution order:
/// 1. `LAUNCHPAD_DATA_DIR` environment variable
/// 2. `<system data dir>/launchpad`
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    Ok(data_dir.join("launchpad"))
}

pub fn state_file_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE_NAME)
}

pub fn catalog_cache_path(root: &Path) -> PathBuf {
    root.join(CATALOG_CACHE_FILE_NAME)
}

pub fn plugins_dir(root: &Path) -> PathBuf {
    root.join("Plugins")
}

pub fn templates_dir(root: &Path) -> PathBuf {
    root.join("Templates")
}

/// Ensure the provided directory exists according to the chosen strategy.
pub fn ensure_directory(path: &Path, strategy: DirectoryCreationStrategy) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }

    match strategy {
        DirectoryCreationStrategy::AutoCreate => {
            fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
        DirectoryCreationStrategy::Disallow => Err(PathError::DirectoryNotFound(path.to_path_buf())),
    }
}
