//! Locating the external build tool and the platform directory opener.

use std::path::{Path, PathBuf};

use launchpad_core::InstallError;
use tracing::debug;

/// Names the build tool is known by, in lookup order.
const BUILD_TOOL_NAMES: [&str; 2] = ["msbuild", "MSBuild"];

#[cfg(target_os = "windows")]
const DIRECTORY_OPENER: &str = "explorer";
#[cfg(target_os = "macos")]
const DIRECTORY_OPENER: &str = "open";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DIRECTORY_OPENER: &str = "xdg-open";

/// Resolve the build tool: an explicit override wins, otherwise search `PATH`.
pub fn find_build_tool(override_path: Option<&Path>) -> Result<PathBuf, InstallError> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(InstallError::BuildToolMissing(format!(
            "configured build tool {} does not exist",
            path.display()
        )));
    }

    for name in BUILD_TOOL_NAMES {
        if let Ok(path) = which::which(name) {
            debug!(path = %path.display(), "found build tool");
            return Ok(path);
        }
    }
    Err(InstallError::BuildToolMissing(
        "msbuild not found on PATH".to_string(),
    ))
}

/// Program that opens a directory in the desktop file manager.
#[must_use]
pub const fn directory_opener() -> &'static str {
    DIRECTORY_OPENER
}
