//! Process runner trait definition.
//!
//! This port drives the external generator and build tool. Implementations
//! own every OS detail (spawning, console windows, signals).

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::ProcessError;

/// An external command expressed as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Directory the child runs in. The parent's own directory is never changed.
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| self.program.display().to_string(), |n| n.to_string_lossy().into_owned())
    }

    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a step command should be run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Give the child a visible console instead of detaching it.
    pub show_window: bool,
    /// Forward the child's output lines to the log.
    pub forward_output: bool,
}

impl RunOptions {
    #[must_use]
    pub const fn with_forward_output(mut self, forward: bool) -> Self {
        self.forward_output = forward;
        self
    }

    #[must_use]
    pub const fn with_show_window(mut self, show: bool) -> Self {
        self.show_window = show;
        self
    }
}

/// How a step command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The child exited on its own. `code` is `None` when a signal ended it.
    Exited { code: Option<i32> },
    /// The child was killed because cancellation was requested.
    Killed,
}

impl RunOutcome {
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }
}

/// Runs generator and build-tool commands on behalf of the pipelines.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// When `cancel` fires before the child exits, the child is killed and
    /// [`RunOutcome::Killed`] is returned. Fails only when the process cannot
    /// be created.
    async fn run(
        &self,
        command: &CommandSpec,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, ProcessError>;

    /// Start `command` without waiting for it (used to launch a built game).
    async fn launch_detached(&self, command: &CommandSpec) -> Result<(), ProcessError>;
}
