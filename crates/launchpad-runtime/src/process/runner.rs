//! [`ProcessRunner`] backed by real OS processes.

use std::time::Duration;

use async_trait::async_trait;
use launchpad_core::{CancellationToken, CommandSpec, ProcessError, ProcessRunner, RunOptions, RunOutcome};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use super::exec::{ExecOptions, exec_detached};
use super::external::{ExternalProcess, Streams};
use super::shutdown::DEFAULT_GRACE;

/// Runs generator and build commands as child processes.
///
/// Cancellation first asks the child to stop, then kills it once the grace
/// period runs out.
#[derive(Debug, Clone)]
pub struct SystemProcessRunner {
    kill_grace: Duration,
}

impl Default for SystemProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProcessRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kill_grace: DEFAULT_GRACE,
        }
    }

    #[must_use]
    pub const fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }
}

fn forward_lines<R>(reader: R, program: String, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(text)) = lines.next_line().await {
            debug!(program = %program, stream, "{text}");
        }
    });
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, ProcessError> {
        let streams = if options.forward_output {
            Streams::Piped
        } else {
            Streams::Null
        };
        let mut process = ExternalProcess::spawn(command, options.show_window, streams)?;

        if let Some(stdout) = process.take_stdout() {
            forward_lines(stdout, process.label().to_string(), "stdout");
        }
        if let Some(stderr) = process.take_stderr() {
            forward_lines(stderr, process.label().to_string(), "stderr");
        }

        tokio::select! {
            status = process.wait() => {
                let code = status?.and_then(|s| s.code());
                Ok(RunOutcome::Exited { code })
            }
            () = cancel.cancelled() => {
                info!(command = %command, "cancel requested, stopping process");
                if let Err(e) = process.terminate(self.kill_grace).await {
                    warn!(error = %e, "failed to stop process cleanly");
                    process.kill().await?;
                }
                Ok(RunOutcome::Killed)
            }
        }
    }

    async fn launch_detached(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        // Fail fast when the program is missing instead of only logging from the waiter.
        if command.program.is_absolute() && !command.program.exists() {
            return Err(ProcessError::NotFound(command.program.display().to_string()));
        }

        let label = command.to_string();
        exec_detached(
            command.clone(),
            ExecOptions {
                capture_output: false,
                show_window: true,
            },
            move |result| match result {
                Ok(output) => debug!(command = %label, code = ?output.code, "detached process exited"),
                Err(e) => warn!(command = %label, error = %e, "detached process failed"),
            },
        );
        Ok(())
    }
}
