//! Blocking directory-tree helpers.
//!
//! Everything here touches the filesystem synchronously; pipelines call it
//! through [`blocking`] so it runs on Tokio's blocking pool.

use std::fs;
use std::io;
use std::path::Path;

use launchpad_core::{InstallError, InstallResult};

/// Run blocking filesystem work off the async workers.
pub async fn blocking<T, F>(work: F) -> InstallResult<T>
where
    F: FnOnce() -> InstallResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| InstallError::io("blocking task", e))?
}

/// Remove a file or a whole directory tree. A missing path is not an error.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Recursively copy `src` into `dest`, overwriting existing files.
///
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy one file into `dir`, keeping its name.
pub fn copy_into(file: &Path, dir: &Path) -> io::Result<()> {
    let name = file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", file.display()),
        )
    })?;
    fs::create_dir_all(dir)?;
    fs::copy(file, dir.join(name)).map(|_| ())
}

/// Replace every occurrence of `token` in a text file. Returns whether the
/// file changed.
pub fn replace_in_file(path: &Path, token: &str, value: &str) -> io::Result<bool> {
    let text = fs::read_to_string(path)?;
    if !text.contains(token) {
        return Ok(false);
    }
    fs::write(path, text.replace(token, value))?;
    Ok(true)
}

/// Whether `path` is a directory with at least one entry.
pub fn is_non_empty_dir(path: &Path) -> io::Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(path)?.next().is_some())
}
