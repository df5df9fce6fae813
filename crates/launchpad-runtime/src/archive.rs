//! Zip extraction for archives shipped inside cloned library trees.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to open archive {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Failed to read archive entry in {path}: {reason}")]
    Entry { path: PathBuf, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Every `.zip` directly inside `dir`, sorted by name.
pub fn find_archives(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut archives: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        })
        .collect();
    archives.sort();
    Ok(archives)
}

fn extract_blocking(archive_path: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let write_err = |path: &Path, e: io::Error| ArchiveError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| ArchiveError::Entry {
            path: archive_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Entries escaping the destination are skipped, not written.
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| write_err(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| write_err(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| write_err(&target, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                .map_err(|e| write_err(&target, e))?;
        }
        written += 1;
    }

    debug!(archive = %archive_path.display(), files = written, "extracted archive");
    Ok(written)
}

/// Extract `archive` into `dest` on the blocking pool. Returns the number of files written.
pub async fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
}
