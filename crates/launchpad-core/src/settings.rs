//! Launcher settings and validation.
//!
//! Every field is optional so partially written state files load cleanly;
//! the `effective_*` accessors supply the defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::BuildConfiguration;

pub const DEFAULT_ENGINE_REPO_URL: &str = "https://github.com/johmani/HydraEngine";
pub const DEFAULT_ENGINE_LIBS_REPO_URL: &str =
    "https://github.com/johmani/HydraEngineLibs_Windows_x64";
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/johmani/HydraLauncher/main/remoteInfo.json";
pub const DEFAULT_GENERATOR_TARGET: &str = "vs2022";

/// Launcher settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Open the output directory once a project build finishes.
    pub open_output_dir_after_build: Option<bool>,

    /// Launch the produced executable once a project build finishes.
    pub run_after_build: Option<bool>,

    /// Forward build tool output to the log.
    pub show_build_output: Option<bool>,

    /// Chain a Build after an engine Download.
    pub auto_build_after_download: Option<bool>,

    /// Configurations built by an engine build, in order.
    pub build_configurations: Option<Vec<BuildConfiguration>>,

    /// Treat a nonzero build tool exit code as a failed build.
    pub fail_on_build_errors: Option<bool>,

    pub engine_repo_url: Option<String>,
    pub engine_libs_repo_url: Option<String>,
    pub catalog_url: Option<String>,

    /// Generator target passed after `--file`, e.g. `vs2022`.
    pub generator_target: Option<String>,

    /// Explicit build tool path. Looked up on `PATH` when unset.
    pub build_tool: Option<PathBuf>,

    /// Explicit `git` executable.
    pub git_program: Option<PathBuf>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            open_output_dir_after_build: Some(false),
            run_after_build: Some(false),
            show_build_output: Some(false),
            auto_build_after_download: Some(true),
            build_configurations: Some(BuildConfiguration::ALL.to_vec()),
            fail_on_build_errors: Some(false),
            engine_repo_url: Some(DEFAULT_ENGINE_REPO_URL.to_string()),
            engine_libs_repo_url: Some(DEFAULT_ENGINE_LIBS_REPO_URL.to_string()),
            catalog_url: Some(DEFAULT_CATALOG_URL.to_string()),
            generator_target: Some(DEFAULT_GENERATOR_TARGET.to_string()),
            build_tool: None,
            git_program: None,
        }
    }

    #[must_use]
    pub fn effective_auto_build(&self) -> bool {
        self.auto_build_after_download.unwrap_or(true)
    }

    #[must_use]
    pub fn effective_open_output_dir(&self) -> bool {
        self.open_output_dir_after_build.unwrap_or(false)
    }

    #[must_use]
    pub fn effective_run_after_build(&self) -> bool {
        self.run_after_build.unwrap_or(false)
    }

    #[must_use]
    pub fn effective_show_build_output(&self) -> bool {
        self.show_build_output.unwrap_or(false)
    }

    #[must_use]
    pub fn effective_fail_on_build_errors(&self) -> bool {
        self.fail_on_build_errors.unwrap_or(false)
    }

    #[must_use]
    pub fn effective_build_configurations(&self) -> Vec<BuildConfiguration> {
        self.build_configurations
            .clone()
            .unwrap_or_else(|| BuildConfiguration::ALL.to_vec())
    }

    #[must_use]
    pub fn effective_engine_repo_url(&self) -> &str {
        self.engine_repo_url.as_deref().unwrap_or(DEFAULT_ENGINE_REPO_URL)
    }

    #[must_use]
    pub fn effective_engine_libs_repo_url(&self) -> &str {
        self.engine_libs_repo_url
            .as_deref()
            .unwrap_or(DEFAULT_ENGINE_LIBS_REPO_URL)
    }

    #[must_use]
    pub fn effective_catalog_url(&self) -> &str {
        self.catalog_url.as_deref().unwrap_or(DEFAULT_CATALOG_URL)
    }

    #[must_use]
    pub fn effective_generator_target(&self) -> &str {
        self.generator_target
            .as_deref()
            .unwrap_or(DEFAULT_GENERATOR_TARGET)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(value) = other.open_output_dir_after_build {
            self.open_output_dir_after_build = value;
        }
        if let Some(value) = other.run_after_build {
            self.run_after_build = value;
        }
        if let Some(value) = other.show_build_output {
            self.show_build_output = value;
        }
        if let Some(value) = other.auto_build_after_download {
            self.auto_build_after_download = value;
        }
        if let Some(ref value) = other.build_configurations {
            self.build_configurations.clone_from(value);
        }
        if let Some(value) = other.fail_on_build_errors {
            self.fail_on_build_errors = value;
        }
        if let Some(ref value) = other.build_tool {
            self.build_tool.clone_from(value);
        }
        if let Some(ref value) = other.engine_repo_url {
            self.engine_repo_url.clone_from(value);
        }
        if let Some(ref value) = other.engine_libs_repo_url {
            self.engine_libs_repo_url.clone_from(value);
        }
        if let Some(ref value) = other.catalog_url {
            self.catalog_url.clone_from(value);
        }
        if let Some(ref value) = other.generator_target {
            self.generator_target.clone_from(value);
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset to the default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub open_output_dir_after_build: Option<Option<bool>>,
    pub run_after_build: Option<Option<bool>>,
    pub show_build_output: Option<Option<bool>>,
    pub auto_build_after_download: Option<Option<bool>>,
    pub build_configurations: Option<Option<Vec<BuildConfiguration>>>,
    pub fail_on_build_errors: Option<Option<bool>>,
    pub build_tool: Option<Option<PathBuf>>,
    pub engine_repo_url: Option<Option<String>>,
    pub engine_libs_repo_url: Option<Option<String>>,
    pub catalog_url: Option<Option<String>>,
    pub generator_target: Option<Option<String>>,
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("At least one build configuration is required")]
    NoBuildConfigurations,

    #[error("Generator target cannot be empty")]
    EmptyGeneratorTarget,

    #[error("{field} must be an http(s) URL, got '{value}'")]
    InvalidUrl { field: &'static str, value: String },
}

fn check_url(field: &'static str, value: Option<&str>) -> Result<(), SettingsError> {
    match value {
        Some(url) if !(url.starts_with("https://") || url.starts_with("http://")) => {
            Err(SettingsError::InvalidUrl {
                field,
                value: url.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings
        .build_configurations
        .as_ref()
        .is_some_and(Vec::is_empty)
    {
        return Err(SettingsError::NoBuildConfigurations);
    }

    if settings
        .generator_target
        .as_ref()
        .is_some_and(|t| t.trim().is_empty())
    {
        return Err(SettingsError::EmptyGeneratorTarget);
    }

    check_url("engine_repo_url", settings.engine_repo_url.as_deref())?;
    check_url("engine_libs_repo_url", settings.engine_libs_repo_url.as_deref())?;
    check_url("catalog_url", settings.catalog_url.as_deref())?;

    Ok(())
}
