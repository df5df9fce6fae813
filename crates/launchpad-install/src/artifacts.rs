//! Staging a built project into its output directory.
//!
//! Layout of one staged configuration:
//!
//! ```text
//! <out>/<binaries from Build/<platform>-<arch>/<Config>/Bin>
//! <out>/Resources/...
//! <out>/Plugins/<name>/<name>.hplugin
//! <out>/Plugins/<name>/Assets/...
//! <out>/Plugins/<name>/Binaries/<platform>-<arch>/<Config>/<shared libraries>
//! ```

use std::fs;
use std::path::Path;

use launchpad_core::layout::{
    self, EXCLUDED_ARTIFACT_EXTENSIONS, SHARED_LIBRARY_EXTENSION,
};
use launchpad_core::{BuildConfiguration, InstallError, InstallResult};
use serde::Serialize;
use tracing::warn;

use crate::tree;

/// What one staging pass copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub binaries: usize,
    pub resources: usize,
    pub plugins: usize,
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn is_excluded(path: &Path) -> bool {
    EXCLUDED_ARTIFACT_EXTENSIONS
        .iter()
        .any(|ext| has_extension(path, ext))
}

fn io_err(path: &Path, err: std::io::Error) -> InstallError {
    InstallError::io(path.display(), err)
}

/// Copy the binaries, resources and plugin payloads of `project` for
/// `config` into `output`.
///
/// Fails with [`InstallError::PathMissing`] when the build produced no
/// binaries directory. A plugin without binaries for `config` is staged
/// without them and logged.
pub fn copy_artifacts(
    project: &Path,
    output: &Path,
    config: BuildConfiguration,
) -> InstallResult<ArtifactReport> {
    let bin_dir = layout::project_binaries_dir(project, config);
    if !bin_dir.is_dir() {
        return Err(InstallError::PathMissing(bin_dir));
    }
    fs::create_dir_all(output).map_err(|e| io_err(output, e))?;

    let mut report = ArtifactReport::default();
    for entry in fs::read_dir(&bin_dir).map_err(|e| io_err(&bin_dir, e))? {
        let path = entry.map_err(|e| io_err(&bin_dir, e))?.path();
        if path.is_file() && !is_excluded(&path) {
            tree::copy_into(&path, output).map_err(|e| io_err(&path, e))?;
            report.binaries += 1;
        }
    }

    let resources = project.join("Resources");
    if resources.is_dir() {
        report.resources = tree::copy_tree(&resources, &output.join("Resources"))
            .map_err(|e| io_err(&resources, e))?;
    }

    let plugins = project.join("Plugins");
    if plugins.is_dir() {
        for entry in fs::read_dir(&plugins).map_err(|e| io_err(&plugins, e))? {
            let plugin_dir = entry.map_err(|e| io_err(&plugins, e))?.path();
            if plugin_dir.is_dir() {
                stage_plugin(&plugin_dir, &output.join("Plugins"), config)?;
                report.plugins += 1;
            }
        }
    }

    Ok(report)
}

fn stage_plugin(plugin_dir: &Path, plugins_out: &Path, config: BuildConfiguration) -> InstallResult<()> {
    let Some(name) = plugin_dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(());
    };
    let out = plugins_out.join(&name);
    let binaries_rel = layout::plugin_binaries_relative(config);
    let binaries_out = out.join(&binaries_rel);
    fs::create_dir_all(&binaries_out).map_err(|e| io_err(&binaries_out, e))?;

    let descriptor = layout::plugin_descriptor(plugin_dir, &name);
    if descriptor.is_file() {
        tree::copy_into(&descriptor, &out).map_err(|e| io_err(&descriptor, e))?;
    }

    let assets = plugin_dir.join("Assets");
    if assets.is_dir() {
        tree::copy_tree(&assets, &out.join("Assets")).map_err(|e| io_err(&assets, e))?;
    }

    let binaries = plugin_dir.join(&binaries_rel);
    if !binaries.is_dir() {
        warn!(plugin = %name, path = %binaries.display(), "plugin has no binaries for this configuration");
        return Ok(());
    }
    for entry in fs::read_dir(&binaries).map_err(|e| io_err(&binaries, e))? {
        let path = entry.map_err(|e| io_err(&binaries, e))?.path();
        if path.is_file() && has_extension(&path, SHARED_LIBRARY_EXTENSION) {
            tree::copy_into(&path, &binaries_out).map_err(|e| io_err(&path, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn binaries_skip_link_and_debug_files() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("Game");
        let bin = layout::project_binaries_dir(&project, BuildConfiguration::Release);
        for file in ["Game.exe", "Game.dll", "Game.lib", "Game.pdb", "Game.exp", "Game.LIB"] {
            touch(&bin.join(file));
        }

        let out = tmp.path().join("out");
        let report = copy_artifacts(&project, &out, BuildConfiguration::Release).unwrap();

        assert_eq!(report.binaries, 2);
        assert!(out.join("Game.exe").is_file());
        assert!(out.join("Game.dll").is_file());
        assert!(!out.join("Game.lib").exists());
        assert!(!out.join("Game.pdb").exists());
        assert!(!out.join("Game.exp").exists());
        assert!(!out.join("Game.LIB").exists());
    }

    #[test]
    fn resources_and_plugins_are_staged() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("Game");
        let config = BuildConfiguration::Debug;
        touch(&layout::project_binaries_dir(&project, config).join("Game"));
        touch(&project.join("Resources").join("Textures").join("a.png"));

        let plugin = project.join("Plugins").join("Physics");
        touch(&layout::plugin_descriptor(&plugin, "Physics"));
        touch(&plugin.join("Assets").join("shader.glsl"));
        let plugin_bin = plugin.join(layout::plugin_binaries_relative(config));
        touch(&plugin_bin.join(format!("Physics.{SHARED_LIBRARY_EXTENSION}")));
        touch(&plugin_bin.join("Physics.pdb"));

        let out = tmp.path().join("out");
        let report = copy_artifacts(&project, &out, config).unwrap();
        assert_eq!(report.plugins, 1);
        assert_eq!(report.resources, 1);

        let staged = out.join("Plugins").join("Physics");
        assert!(out.join("Resources").join("Textures").join("a.png").is_file());
        assert!(layout::plugin_descriptor(&staged, "Physics").is_file());
        assert!(staged.join("Assets").join("shader.glsl").is_file());
        let staged_bin = staged.join(layout::plugin_binaries_relative(config));
        assert!(staged_bin.join(format!("Physics.{SHARED_LIBRARY_EXTENSION}")).is_file());
        assert!(!staged_bin.join("Physics.pdb").exists());
    }

    #[test]
    fn missing_build_output_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = copy_artifacts(tmp.path(), &tmp.path().join("out"), BuildConfiguration::Dist)
            .unwrap_err();
        assert!(matches!(err, InstallError::PathMissing(_)));
    }
}
