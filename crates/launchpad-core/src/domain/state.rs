//! Installation state machine values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of one installable entity.
///
/// `Installing`, `Build` and `Wait` mark an active pipeline. While an entity
/// sits in one of them no other pipeline may be admitted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationState {
    #[default]
    NotInstalled,
    Installing,
    Installed,
    /// Transient marker while a delete is finishing. Only used to disable actions.
    Wait,
    Build,
    Failed,
}

impl InstallationState {
    /// True while a Download, Build or Delete pipeline owns the entity.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Installing | Self::Build | Self::Wait)
    }

    /// Installed, Failed and NotInstalled are stable until a new action.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Whether the local tree is expected to be on disk.
    #[must_use]
    pub const fn has_local_tree(self) -> bool {
        matches!(self, Self::Installed | Self::Build)
    }

    /// Collapse to the coarse value written to disk.
    ///
    /// A build in flight still has its source tree, so it persists as installed.
    #[must_use]
    pub const fn persisted(self) -> PersistedState {
        if self.has_local_tree() {
            PersistedState::Installed
        } else {
            PersistedState::NotInstalled
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotInstalled => "not_installed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Wait => "wait",
            Self::Build => "build",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstallationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only two states that survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistedState {
    Installed,
    NotInstalled,
}

impl From<PersistedState> for InstallationState {
    fn from(value: PersistedState) -> Self {
        match value {
            PersistedState::Installed => Self::Installed,
            PersistedState::NotInstalled => Self::NotInstalled,
        }
    }
}

/// Raised when a stored state string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown persisted installation state '{0}'")]
pub struct UnknownStateError(pub String);

impl FromStr for PersistedState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Installed" => Ok(Self::Installed),
            "NotInstalled" => Ok(Self::NotInstalled),
            other => Err(UnknownStateError(other.to_string())),
        }
    }
}
