//! [`RemoteTransfer`] implemented with the system `git` executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures_util::StreamExt;
use launchpad_core::{
    CancellationToken, CloneOutcome, CommandSpec, RemoteTransfer, TransferError, TransferObserver,
};
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{debug, info, warn};

use super::progress_parser::parse_progress_line;
use crate::process::{ExecOptions, exec};

/// Longest progress line accepted before framing is abandoned.
const MAX_LINE_LEN: usize = 16 * 1024;

/// Clones and inspects working trees by shelling out to `git`.
#[derive(Debug, Clone)]
pub struct GitCliTransfer {
    program: PathBuf,
}

impl GitCliTransfer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `program` when given, otherwise find `git` on `PATH`.
    pub fn discover(program: Option<&Path>) -> Result<Self, TransferError> {
        if let Some(path) = program {
            return Ok(Self::new(path));
        }
        which::which("git")
            .map(Self::new)
            .map_err(|e| TransferError::ToolMissing(format!("git: {e}")))
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn clone_command(&self, url: &str, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("clone")
            .arg("--recursive")
            .arg("--progress")
            .arg(url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Pump {
    Finished,
    Canceled,
}

/// Read git's stderr until it closes, forwarding progress to `observer`.
///
/// Once framing fails the rest of the stream is still drained, so git never
/// blocks on a full pipe.
async fn pump_progress<R>(
    reader: R,
    url: &str,
    observer: &dyn TransferObserver,
    cancel: &CancellationToken,
    last_message: &mut String,
) -> Pump
where
    R: AsyncRead + Unpin,
{
    // git redraws progress with '\r', so split on both line endings.
    let codec = AnyDelimiterCodec::new_with_max_length(b"\r\n".to_vec(), Vec::new(), MAX_LINE_LEN);
    let mut frames = FramedRead::new(reader, codec);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Pump::Canceled,
            frame = frames.next() => match frame {
                Some(Ok(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    if let Some(parsed) = parse_progress_line(&line) {
                        observer.on_progress(parsed.to_update());
                    } else if !line.trim().is_empty() {
                        debug!(url, "git: {}", line.trim());
                        *last_message = line.trim().to_string();
                    }
                }
                Some(Err(e)) => {
                    warn!(url, error = %e, "unreadable git output, discarding the rest");
                    break;
                }
                None => return Pump::Finished,
            }
        }
    }

    let mut rest = frames.into_inner();
    let mut sink = tokio::io::sink();
    tokio::select! {
        biased;
        () = cancel.cancelled() => Pump::Canceled,
        drained = tokio::io::copy(&mut rest, &mut sink) => {
            if let Err(e) = drained {
                debug!(url, error = %e, "git stderr closed while draining");
            }
            Pump::Finished
        }
    }
}

async fn stop(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill git after cancel");
    }
}

#[async_trait]
impl RemoteTransfer for GitCliTransfer {
    async fn clone_recursive(
        &self,
        url: &str,
        dest: &Path,
        observer: &dyn TransferObserver,
        cancel: &CancellationToken,
    ) -> CloneOutcome {
        if cancel.is_cancelled() {
            return CloneOutcome::Canceled;
        }

        info!(url, dest = %dest.display(), "cloning");
        let mut child = match self.clone_command(url, dest).spawn() {
            Ok(child) => child,
            Err(e) => return CloneOutcome::failed(format!("failed to start git: {e}")),
        };

        let mut last_message = String::new();
        if let Some(stderr) = child.stderr.take() {
            if pump_progress(stderr, url, observer, cancel, &mut last_message).await
                == Pump::Canceled
            {
                stop(&mut child).await;
                info!(url, "clone canceled");
                return CloneOutcome::Canceled;
            }
        }

        let status = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                stop(&mut child).await;
                return CloneOutcome::Canceled;
            }
            status = child.wait() => status,
        };

        match status {
            Ok(status) if status.success() => CloneOutcome::Completed,
            Ok(status) => {
                warn!(url, %status, "git clone failed: {last_message}");
                CloneOutcome::failed(if last_message.is_empty() {
                    format!("git exited with {status}")
                } else {
                    last_message
                })
            }
            Err(e) => CloneOutcome::failed(format!("waiting on git: {e}")),
        }
    }

    async fn current_commit_id(&self, path: &Path) -> Result<String, TransferError> {
        let command = CommandSpec::new(&self.program)
            .arg("-C")
            .arg(path.to_string_lossy())
            .args(["rev-parse", "HEAD"]);

        let output = exec(&command, ExecOptions::captured())
            .await
            .map_err(|e| TransferError::Command(e.to_string()))?;

        if !output.success() {
            return Err(TransferError::NotARepository(format!(
                "{}: {}",
                path.display(),
                output.stderr.trim()
            )));
        }

        let commit = output.stdout.trim().to_string();
        if commit.is_empty() {
            return Err(TransferError::NotARepository(path.display().to_string()));
        }
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use launchpad_core::TransferUpdate;
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<TransferUpdate>>);

    impl TransferObserver for Recorder {
        fn on_progress(&self, update: TransferUpdate) {
            self.0.lock().unwrap().push(update);
        }
    }

    #[tokio::test]
    async fn progress_lines_reach_the_observer() {
        let stderr: &[u8] =
            b"Cloning into 'e'...\nReceiving objects:  50% (5/10)\rReceiving objects: 100% (10/10), done.\n";
        let recorder = Recorder::default();
        let mut last = String::new();

        let pump = pump_progress(stderr, "u", &recorder, &CancellationToken::new(), &mut last).await;

        assert_eq!(pump, Pump::Finished);
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
        assert_eq!(last, "Cloning into 'e'...");
    }

    #[tokio::test]
    async fn oversized_line_keeps_the_pipe_drained() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let producer = tokio::spawn(async move {
            writer.write_all(&vec![b'x'; MAX_LINE_LEN + 1]).await.unwrap();
            writer.write_all(b"\n").await.unwrap();
            // Far more than the pipe holds; only completes if someone reads.
            for _ in 0..256 {
                writer.write_all(&[b'y'; 1024]).await.unwrap();
            }
        });

        let recorder = Recorder::default();
        let mut last = String::new();
        let pump = tokio::time::timeout(
            Duration::from_secs(10),
            pump_progress(reader, "u", &recorder, &CancellationToken::new(), &mut last),
        )
        .await
        .unwrap();

        assert_eq!(pump, Pump::Finished);
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_interrupts_a_silent_stream() {
        let (_writer, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut last = String::new();

        let pump = pump_progress(reader, "u", &Recorder::default(), &cancel, &mut last).await;
        assert_eq!(pump, Pump::Canceled);
    }
}
