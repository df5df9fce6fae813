//! Clone tests against a local repository.
//!
//! Skipped when `git` is not installed.

use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use launchpad_core::{CancellationToken, CloneOutcome, RemoteTransfer, TransferUpdate};
use launchpad_runtime::GitCliTransfer;
use tempfile::TempDir;

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=Launchpad", "-c", "user.email=launchpad@example.com"])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {args:?} failed");
}

fn make_origin(root: &Path) -> std::path::PathBuf {
    let origin = root.join("origin");
    std::fs::create_dir(&origin).unwrap();
    git(&origin, &["init", "-q"]);
    std::fs::write(origin.join("premake.lua"), "-- workspace").unwrap();
    std::fs::write(origin.join("build.lua"), "-- build").unwrap();
    git(&origin, &["add", "."]);
    git(&origin, &["commit", "-q", "-m", "initial"]);
    origin
}

#[tokio::test]
async fn clone_completes_and_reports_commit() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let origin = make_origin(tmp.path());
    let dest = tmp.path().join("HydraEngine");
    let transfer = GitCliTransfer::discover(None).unwrap();

    let updates: Arc<Mutex<Vec<TransferUpdate>>> = Arc::default();
    let sink = Arc::clone(&updates);
    let observer = move |update: TransferUpdate| sink.lock().unwrap().push(update);

    let url = format!("file://{}", origin.display());
    let outcome = transfer
        .clone_recursive(&url, &dest, &observer, &CancellationToken::new())
        .await;

    assert_eq!(outcome, CloneOutcome::Completed);
    assert!(dest.join("premake.lua").is_file());

    let commit = transfer.current_commit_id(&dest).await.unwrap();
    assert_eq!(commit.len(), 40);
    assert!(commit.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn clone_of_missing_remote_fails() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let transfer = GitCliTransfer::discover(None).unwrap();
    let url = format!("file://{}", tmp.path().join("nope").display());

    let outcome = transfer
        .clone_recursive(&url, &tmp.path().join("dest"), &|_: TransferUpdate| {}, &CancellationToken::new())
        .await;
    assert!(matches!(outcome, CloneOutcome::Failed(_)));
}

#[tokio::test]
async fn pre_cancelled_clone_does_not_start() {
    let tmp = TempDir::new().unwrap();
    let transfer = GitCliTransfer::new("git");
    let cancel = CancellationToken::new();
    transfer.cancel(&cancel);

    let dest = tmp.path().join("dest");
    let outcome = transfer
        .clone_recursive("file:///nowhere", &dest, &|_: TransferUpdate| {}, &cancel)
        .await;
    assert_eq!(outcome, CloneOutcome::Canceled);
    assert!(!dest.exists());
}

#[tokio::test]
async fn commit_id_of_plain_directory_is_an_error() {
    if !git_available() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let transfer = GitCliTransfer::discover(None).unwrap();
    assert!(transfer.current_commit_id(tmp.path()).await.is_err());
}
