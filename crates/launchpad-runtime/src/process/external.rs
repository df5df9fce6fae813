//! Handle to one external OS process.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use launchpad_core::{CommandSpec, ProcessError};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use super::shutdown::shutdown_child;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Where the child's standard streams go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Streams {
    Inherit,
    Piped,
    Null,
}

/// A started process.
///
/// `wait`, `kill` and `terminate` all release the OS handle. Once released,
/// further calls are no-ops that report the recorded exit status.
#[derive(Debug)]
pub struct ExternalProcess {
    label: String,
    pid: Option<u32>,
    child: Option<Child>,
    status: Option<ExitStatus>,
}

pub(crate) fn build_command(spec: &CommandSpec, show_window: bool, streams: Streams) -> Command {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    if let Some(dir) = spec.working_dir() {
        cmd.current_dir(dir);
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    let (out, err) = match streams {
        Streams::Inherit => (Stdio::inherit(), Stdio::inherit()),
        Streams::Piped => (Stdio::piped(), Stdio::piped()),
        Streams::Null => (Stdio::null(), Stdio::null()),
    };
    cmd.stdout(out).stderr(err);

    if !show_window {
        cmd.stdin(Stdio::null());
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

impl ExternalProcess {
    /// Spawn `command` without blocking, inheriting the parent's output.
    pub fn start(command: &CommandSpec, show_window: bool) -> Result<Self, ProcessError> {
        Self::spawn(command, show_window, Streams::Inherit)
    }

    pub(crate) fn spawn(
        command: &CommandSpec,
        show_window: bool,
        streams: Streams,
    ) -> Result<Self, ProcessError> {
        let mut cmd = build_command(command, show_window, streams);
        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound(command.program.display().to_string())
            } else {
                ProcessError::start_failed(command.program_name(), e)
            }
        })?;

        let pid = child.id();
        debug!(pid = ?pid, command = %command, "started process");
        Ok(Self {
            label: command.program_name(),
            pid,
            child: Some(child),
            status: None,
        })
    }

    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True once the OS handle has been released.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.child.is_none()
    }

    /// Exit status recorded when the handle was released.
    #[must_use]
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    pub(crate) fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.as_mut().and_then(|c| c.stdout.take())
    }

    pub(crate) fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.as_mut().and_then(|c| c.stderr.take())
    }

    /// Wait for exit and release the handle. Idempotent.
    ///
    /// Cancel safe: the handle is only released after the child has been
    /// reaped, so a dropped `wait` leaves the process killable.
    pub async fn wait(&mut self) -> Result<Option<ExitStatus>, ProcessError> {
        if let Some(child) = self.child.as_mut() {
            let status = child
                .wait()
                .await
                .map_err(|e| ProcessError::Io(format!("wait on {}: {e}", self.label)))?;
            debug!(pid = ?self.pid, %status, "process exited");
            self.release(status);
        }
        Ok(self.status)
    }

    /// Forcibly terminate the process if it is still running and release the handle.
    pub async fn kill(&mut self) -> Result<(), ProcessError> {
        if let Some(child) = self.child.as_mut() {
            child
                .kill()
                .await
                .map_err(|e| ProcessError::Io(format!("kill {}: {e}", self.label)))?;
            let status = child
                .wait()
                .await
                .map_err(|e| ProcessError::Io(format!("wait on {}: {e}", self.label)))?;
            debug!(pid = ?self.pid, "process killed");
            self.release(status);
        }
        Ok(())
    }

    /// SIGTERM, then SIGKILL after `grace`. Releases the handle.
    pub async fn terminate(&mut self, grace: Duration) -> Result<Option<ExitStatus>, ProcessError> {
        if let Some(child) = self.child.as_mut() {
            let status = shutdown_child(child, grace)
                .await
                .map_err(|e| ProcessError::Io(format!("terminate {}: {e}", self.label)))?;
            self.release(status);
        }
        Ok(self.status)
    }

    fn release(&mut self, status: ExitStatus) {
        self.status = Some(status);
        self.child = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_reports_missing_program() {
        let spec = CommandSpec::new("/definitely/not/a/real/program");
        let err = ExternalProcess::start(&spec, false).unwrap_err();
        assert!(matches!(err, ProcessError::NotFound(_)));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn wait_is_idempotent() {
        let spec = CommandSpec::new("sh").args(["-c", "exit 3"]);
        let mut process = ExternalProcess::spawn(&spec, false, Streams::Null).unwrap();

        let first = process.wait().await.unwrap();
        assert!(process.is_released());
        let second = process.wait().await.unwrap();
        assert_eq!(first.and_then(|s| s.code()), Some(3));
        assert_eq!(first, second);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn kill_releases_running_process() {
        let spec = CommandSpec::new("sleep").arg("30");
        let mut process = ExternalProcess::spawn(&spec, false, Streams::Null).unwrap();
        assert!(process.pid().is_some());

        process.kill().await.unwrap();
        assert!(process.is_released());
        // A second kill and a wait after kill are both no-ops.
        process.kill().await.unwrap();
        let status = process.wait().await.unwrap();
        assert!(status.is_none_or(|s| !s.success()));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn interrupted_wait_keeps_process_terminable() {
        let spec = CommandSpec::new("sleep").arg("30");
        let mut process = ExternalProcess::spawn(&spec, false, Streams::Null).unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(50), process.wait()).await;
        assert!(waited.is_err());
        assert!(!process.is_released());

        let status = process.terminate(Duration::from_millis(200)).await.unwrap();
        assert!(process.is_released());
        assert!(status.is_some_and(|s| !s.success()));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn working_dir_applies_to_child_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let before = std::env::current_dir().unwrap();
        let marker = tmp.path().join("marker");
        let spec = CommandSpec::new("sh")
            .args(["-c", "touch marker"])
            .current_dir(tmp.path());

        let mut process = ExternalProcess::spawn(&spec, false, Streams::Null).unwrap();
        process.wait().await.unwrap();

        assert!(marker.exists());
        assert_eq!(std::env::current_dir().unwrap(), before);
    }
}
