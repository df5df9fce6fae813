//! CLI errors and their exit codes.

use launchpad_core::InstallError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Install error reported by the orchestrator.
    #[error("{0}")]
    Install(#[from] InstallError),

    /// No entity matches the given name.
    #[error("No {kind} named '{name}'")]
    UnknownEntity { kind: &'static str, name: String },

    /// The pipeline finished in a failed state.
    #[error("{name} failed: {reason}")]
    PipelineFailed { name: String, reason: String },

    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Exit codes follow sysexits.h where one applies.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Install(InstallError::Invalid(_) | InstallError::Unsupported(_)) => 2,
            Self::Install(InstallError::PathMissing(_)) | Self::UnknownEntity { .. } => 66,
            Self::Install(InstallError::BuildToolMissing(_)) => 69,
            Self::Install(InstallError::Io(_)) => 74,
            Self::Install(InstallError::Settings(_)) => 78,
            Self::Interrupted => 130,
            Self::Install(_) | Self::PipelineFailed { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::Interrupted.exit_code(), 130);
        assert_eq!(
            CliError::UnknownEntity {
                kind: "engine",
                name: "x".into()
            }
            .exit_code(),
            66
        );
        assert_eq!(
            CliError::from(InstallError::Invalid("bad".into())).exit_code(),
            2
        );
        assert_eq!(CliError::from(InstallError::TransferCanceled).exit_code(), 1);
    }
}
