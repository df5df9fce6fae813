//! Build configurations understood by the build tool.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildConfiguration {
    Debug,
    Release,
    Profile,
    Dist,
}

impl BuildConfiguration {
    /// Every configuration, in build order.
    pub const ALL: [Self; 4] = [Self::Debug, Self::Release, Self::Profile, Self::Dist];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
            Self::Profile => "Profile",
            Self::Dist => "Dist",
        }
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown build configuration '{0}' (expected Debug, Release, Profile or Dist)")]
pub struct UnknownConfigurationError(pub String);

impl FromStr for BuildConfiguration {
    type Err = UnknownConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownConfigurationError(s.to_string()))
    }
}
