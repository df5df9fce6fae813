//! One-shot command execution with optional output capture.
//!
//! `exec` waits for the child; `exec_detached` returns at once and hands the
//! result to a callback from a waiter task. In both cases the process handle
//! is released before the result is delivered.

use launchpad_core::{CommandSpec, ProcessError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::external::{ExternalProcess, Streams};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub capture_output: bool,
    pub show_window: bool,
}

impl ExecOptions {
    #[must_use]
    pub const fn captured() -> Self {
        Self {
            capture_output: true,
            show_window: false,
        }
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code; `None` when a signal ended the process.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Standard output followed by standard error.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        warn!(error = %e, "failed to read process output");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Run `command` and wait for it to exit.
///
/// With `capture_output`, both streams are drained concurrently until the
/// child closes them, so bounded output is never truncated and a chatty
/// child cannot deadlock on a full pipe.
pub async fn exec(command: &CommandSpec, options: ExecOptions) -> Result<ExecOutput, ProcessError> {
    let streams = if options.capture_output {
        Streams::Piped
    } else {
        Streams::Inherit
    };
    let mut process = ExternalProcess::spawn(command, options.show_window, streams)?;

    let (stdout, stderr) = tokio::join!(
        read_all(process.take_stdout()),
        read_all(process.take_stderr())
    );
    let status = process.wait().await?;

    debug!(command = %command, code = ?status.and_then(|s| s.code()), "exec finished");
    Ok(ExecOutput {
        code: status.and_then(|s| s.code()),
        stdout,
        stderr,
    })
}

/// Start `command` and return immediately.
///
/// A waiter task owns the process and calls `on_complete` after exit. Must be
/// called from within a Tokio runtime.
pub fn exec_detached<F>(command: CommandSpec, options: ExecOptions, on_complete: F) -> JoinHandle<()>
where
    F: FnOnce(Result<ExecOutput, ProcessError>) + Send + 'static,
{
    tokio::spawn(async move {
        let result = exec(&command, options).await;
        on_complete(result);
    })
}
