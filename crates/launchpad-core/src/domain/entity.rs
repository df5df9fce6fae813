//! Installable entities: engine instances, plugins, templates and projects.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::progress::Progress;
use super::state::InstallationState;

/// Stable identifier of an engine instance, persisted with projects that link to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineId(pub u64);

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Engine,
    Plugin,
    Template,
    Project,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Plugin => "plugin",
            Self::Template => "template",
            Self::Project => "project",
        }
    }

    /// Whether the entity is fetched from a remote source.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Project)
    }

    /// Whether the Build pipeline applies.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(self, Self::Engine | Self::Project)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-variant payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDetails {
    Engine {
        id: EngineId,
        commit_id: Option<String>,
    },
    Plugin {
        description: String,
        enabled_by_default: bool,
    },
    Template {
        description: String,
        thumbnail: Option<PathBuf>,
    },
    Project {
        engine_id: Option<EngineId>,
        include_source_code: bool,
        build_dir: Option<PathBuf>,
    },
}

/// One item managed by the launcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallableEntity {
    pub name: String,
    /// Remote source for engines, plugins and templates.
    pub source_url: Option<String>,
    pub path: PathBuf,
    pub state: InstallationState,
    pub progress: Progress,
    pub details: EntityDetails,
}

impl InstallableEntity {
    fn with_details(name: String, path: PathBuf, details: EntityDetails) -> Self {
        Self {
            name,
            source_url: None,
            path,
            state: InstallationState::NotInstalled,
            progress: Progress::default(),
            details,
        }
    }

    /// An engine instance rooted at `path`. Its display name is the directory name.
    pub fn engine(id: EngineId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self::with_details(
            name,
            path,
            EntityDetails::Engine {
                id,
                commit_id: None,
            },
        )
    }

    pub fn plugin(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        description: impl Into<String>,
    ) -> Self {
        Self::with_details(
            name.into(),
            path.into(),
            EntityDetails::Plugin {
                description: description.into(),
                enabled_by_default: false,
            },
        )
    }

    pub fn template(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        description: impl Into<String>,
    ) -> Self {
        Self::with_details(
            name.into(),
            path.into(),
            EntityDetails::Template {
                description: description.into(),
                thumbnail: None,
            },
        )
    }

    pub fn project(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        engine_id: Option<EngineId>,
    ) -> Self {
        Self::with_details(
            name.into(),
            path.into(),
            EntityDetails::Project {
                engine_id,
                include_source_code: false,
                build_dir: None,
            },
        )
    }

    #[must_use]
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn with_state(mut self, state: InstallationState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self.details {
            EntityDetails::Engine { .. } => EntityKind::Engine,
            EntityDetails::Plugin { .. } => EntityKind::Plugin,
            EntityDetails::Template { .. } => EntityKind::Template,
            EntityDetails::Project { .. } => EntityKind::Project,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn engine_id(&self) -> Option<EngineId> {
        match self.details {
            EntityDetails::Engine { id, .. } => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match &self.details {
            EntityDetails::Plugin { description, .. }
            | EntityDetails::Template { description, .. } => Some(description),
            _ => None,
        }
    }
}
