//! On-disk layout of engine checkouts, projects and plugins.
//!
//! All paths the pipelines touch are computed here so the orchestrator and
//! the tests agree on one layout.

use std::path::{Path, PathBuf};

use crate::domain::BuildConfiguration;

/// Directory name an engine checkout must carry to be recognised.
pub const ENGINE_DIR_NAME: &str = "HydraEngine";
pub const ENGINE_SOLUTION: &str = "HydraEngine.sln";
/// Generator descriptor at the root of engines and projects.
pub const GENERATOR_DESCRIPTOR: &str = "premake.lua";
pub const ENGINE_BUILD_SCRIPT: &str = "build.lua";
pub const PLUGIN_DESCRIPTOR_EXTENSION: &str = "hplugin";
pub const PROJECT_FILE_EXTENSION: &str = "hproject";
pub const TEMPLATE_CONFIG: &str = "config.json";
pub const TEMPLATE_THUMBNAIL: &str = "thumbnail.jpg";
/// Placeholder token replaced by the project name when instantiating a template.
pub const PROJECT_NAME_TOKEN: &str = "PROJECT_NAME";

/// Build intermediates that never ship with a project.
pub const EXCLUDED_ARTIFACT_EXTENSIONS: [&str; 3] = ["exp", "lib", "pdb"];

#[cfg(target_os = "windows")]
pub const PLATFORM: &str = "Windows";
#[cfg(target_os = "macos")]
pub const PLATFORM: &str = "MacOS";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const PLATFORM: &str = "Linux";

#[cfg(target_os = "windows")]
pub const SHARED_LIBRARY_EXTENSION: &str = "dll";
#[cfg(target_os = "macos")]
pub const SHARED_LIBRARY_EXTENSION: &str = "dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const SHARED_LIBRARY_EXTENSION: &str = "so";

/// `<platform>-<arch>` segment used by the generated build trees.
#[must_use]
pub fn target_triple_dir() -> String {
    format!("{PLATFORM}-{}", std::env::consts::ARCH)
}

fn executable_name(stem: &str) -> String {
    format!("{stem}{}", std::env::consts::EXE_SUFFIX)
}

pub fn engine_descriptor(engine: &Path) -> PathBuf {
    engine.join(GENERATOR_DESCRIPTOR)
}

pub fn engine_solution(engine: &Path) -> PathBuf {
    engine.join(ENGINE_SOLUTION)
}

/// Dependent library tree cloned after the main engine tree.
pub fn engine_libs_dir(engine: &Path) -> PathBuf {
    engine.join("ThirdParty").join("Lib")
}

/// Directory the generator must run from.
pub fn generator_dir(engine: &Path) -> PathBuf {
    engine.join("ThirdParty").join("Premake").join(PLATFORM)
}

pub fn generator_executable(engine: &Path) -> PathBuf {
    generator_dir(engine).join(executable_name("premake5"))
}

pub fn project_descriptor(project: &Path) -> PathBuf {
    project.join(GENERATOR_DESCRIPTOR)
}

pub fn project_solution(project: &Path, name: &str) -> PathBuf {
    project.join(format!("{name}.sln"))
}

pub fn project_file(project: &Path, name: &str) -> PathBuf {
    project.join(format!("{name}.{PROJECT_FILE_EXTENSION}"))
}

/// Where the build tool leaves a project's binaries for one configuration.
pub fn project_binaries_dir(project: &Path, config: BuildConfiguration) -> PathBuf {
    project
        .join("Build")
        .join(target_triple_dir())
        .join(config.as_str())
        .join("Bin")
}

/// Output layout for one configuration, honouring a custom build directory.
pub fn project_output_dir(
    project: &Path,
    build_dir: Option<&Path>,
    config: BuildConfiguration,
) -> PathBuf {
    build_dir.map_or_else(
        || project.join("Build").join("Out"),
        Path::to_path_buf,
    )
    .join(config.as_str())
}

/// Binaries of one plugin relative to the plugin root.
pub fn plugin_binaries_relative(config: BuildConfiguration) -> PathBuf {
    PathBuf::from("Binaries")
        .join(target_triple_dir())
        .join(config.as_str())
}

pub fn plugin_descriptor(plugin_dir: &Path, name: &str) -> PathBuf {
    plugin_dir.join(format!("{name}.{PLUGIN_DESCRIPTOR_EXTENSION}"))
}

pub fn project_executable(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(executable_name(name))
}

/// A directory is an engine checkout when it exists, carries both build
/// scripts, and is named [`ENGINE_DIR_NAME`].
pub fn is_valid_engine_directory(path: &Path) -> bool {
    path.is_dir()
        && path.join(GENERATOR_DESCRIPTOR).is_file()
        && path.join(ENGINE_BUILD_SCRIPT).is_file()
        && path.file_name().is_some_and(|n| n == ENGINE_DIR_NAME)
}
