//! Fake adapters and a harness for orchestrator tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use launchpad_core::layout::{self, ENGINE_SOLUTION};
use launchpad_core::settings::{DEFAULT_ENGINE_LIBS_REPO_URL, DEFAULT_ENGINE_REPO_URL};
use launchpad_core::{
    CancellationToken, Catalog, CatalogError, CatalogSource, CloneOutcome, CommandSpec,
    EntityHandle, InstallEvent, InstallEventEmitter, InstallableEntity, InstallationState,
    LauncherState, LauncherStore, PipelineOutcome, ProcessError, ProcessRunner, Progress,
    RemoteTransfer, RunOptions, RunOutcome, Settings, StoreError, TransferError,
    TransferObserver, TransferUpdate,
};
use launchpad_install::{InstallationOrchestrator, LauncherDirs, OrchestratorDeps};
use tempfile::TempDir;
use tokio::sync::Notify;

pub const ENGINE_URL: &str = DEFAULT_ENGINE_REPO_URL;
pub const LIBS_URL: &str = DEFAULT_ENGINE_LIBS_REPO_URL;
pub const FAKE_REVISION: &str = "3f1c2a9d0b7e4f5a6c8d9e0f1a2b3c4d5e6f7a8b";

// =============================================================================
// Remote transfer
// =============================================================================

#[derive(Debug, Clone)]
pub enum CloneBehavior {
    /// Write the configured files and complete.
    Complete,
    Fail(String),
    /// Create the destination, then wait for cancellation.
    BlockUntilCancelled,
    Panic,
}

#[derive(Default)]
pub struct FakeTransfer {
    behaviors: Mutex<HashMap<String, CloneBehavior>>,
    files: Mutex<HashMap<String, Vec<(String, Vec<u8>)>>>,
    pub clones: Mutex<Vec<(String, PathBuf)>>,
    pub blocked: Notify,
}

impl FakeTransfer {
    pub fn set_behavior(&self, url: &str, behavior: CloneBehavior) {
        self.behaviors.lock().unwrap().insert(url.to_string(), behavior);
    }

    pub fn set_files(&self, url: &str, files: Vec<(&str, Vec<u8>)>) {
        let files = files.into_iter().map(|(p, b)| (p.to_string(), b)).collect();
        self.files.lock().unwrap().insert(url.to_string(), files);
    }

    pub fn cloned_urls(&self) -> Vec<String> {
        self.clones.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    /// Resolves once a clone is parked waiting for cancellation.
    pub async fn wait_blocked(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.blocked.notified())
            .await
            .expect("no clone blocked in time");
    }
}

#[async_trait]
impl RemoteTransfer for FakeTransfer {
    async fn clone_recursive(
        &self,
        url: &str,
        dest: &Path,
        observer: &dyn TransferObserver,
        cancel: &CancellationToken,
    ) -> CloneOutcome {
        self.clones
            .lock()
            .unwrap()
            .push((url.to_string(), dest.to_path_buf()));
        if cancel.is_cancelled() {
            return CloneOutcome::Canceled;
        }
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(CloneBehavior::Complete);

        std::fs::create_dir_all(dest).unwrap();
        observer.on_progress(TransferUpdate::new("Receiving objects", 5, 10, 0.4));

        match behavior {
            CloneBehavior::Complete => {
                let files = self.files.lock().unwrap().get(url).cloned().unwrap_or_default();
                for (rel, body) in files {
                    let path = dest.join(rel);
                    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                    std::fs::write(path, body).unwrap();
                }
                std::fs::write(dest.join(".origin"), url).unwrap();
                observer.on_progress(TransferUpdate::new("Checking out files", 10, 10, 1.0));
                CloneOutcome::Completed
            }
            CloneBehavior::Fail(reason) => CloneOutcome::Failed(reason),
            CloneBehavior::BlockUntilCancelled => {
                std::fs::write(dest.join(".partial"), "pack").unwrap();
                self.blocked.notify_one();
                cancel.cancelled().await;
                CloneOutcome::Canceled
            }
            CloneBehavior::Panic => panic!("transfer exploded"),
        }
    }

    async fn current_commit_id(&self, path: &Path) -> Result<String, TransferError> {
        if path.is_dir() {
            Ok(FAKE_REVISION.to_string())
        } else {
            Err(TransferError::NotARepository(path.display().to_string()))
        }
    }
}

// =============================================================================
// Process runner
// =============================================================================

/// Generator runs write the solution; build-tool runs write project binaries.
pub struct FakeRunner {
    pub commands: Mutex<Vec<CommandSpec>>,
    pub launched: Mutex<Vec<CommandSpec>>,
    pub exit_code: AtomicI32,
    pub generate_solution: AtomicBool,
    pub block_builds: AtomicBool,
    pub build_blocked: Notify,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            commands: Mutex::default(),
            launched: Mutex::default(),
            exit_code: AtomicI32::new(0),
            generate_solution: AtomicBool::new(true),
            block_builds: AtomicBool::new(false),
            build_blocked: Notify::new(),
        }
    }
}

impl FakeRunner {
    pub fn command_lines(&self) -> Vec<String> {
        self.commands.lock().unwrap().iter().map(ToString::to_string).collect()
    }

    pub fn generator_runs(&self) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program_name().starts_with("premake5"))
            .count()
    }

    pub fn build_runs(&self) -> usize {
        let total = self.commands.lock().unwrap().len();
        total - self.generator_runs()
    }

    pub async fn wait_build_blocked(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.build_blocked.notified())
            .await
            .expect("no build blocked in time");
    }

    fn generate(command: &CommandSpec) {
        let descriptor = command
            .args
            .iter()
            .find_map(|a| a.strip_prefix("--file="))
            .map(PathBuf::from)
            .unwrap();
        let root = descriptor.parent().unwrap();
        let is_project = command.args.iter().any(|a| a.starts_with("--enginePath="));
        let solution = if is_project {
            let name = root.file_name().unwrap().to_string_lossy().into_owned();
            layout::project_solution(root, &name)
        } else {
            root.join(ENGINE_SOLUTION)
        };
        std::fs::write(solution, "solution").unwrap();
    }

    fn compile(command: &CommandSpec) {
        let solution = PathBuf::from(&command.args[0]);
        if solution.file_name().is_some_and(|n| n == ENGINE_SOLUTION) {
            return;
        }
        let config = command
            .args
            .iter()
            .find_map(|a| a.strip_prefix("/p:Configuration="))
            .and_then(|c| c.parse().ok())
            .unwrap();
        let project = solution.parent().unwrap();
        let name = solution.file_stem().unwrap().to_string_lossy().into_owned();
        let bin = layout::project_binaries_dir(project, config);
        std::fs::create_dir_all(&bin).unwrap();
        let exe = layout::project_executable(&bin, &name);
        std::fs::write(exe, "binary").unwrap();
        std::fs::write(bin.join(format!("{name}.pdb")), "symbols").unwrap();
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        _options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, ProcessError> {
        self.commands.lock().unwrap().push(command.clone());
        if command.program_name().starts_with("premake5") {
            if self.generate_solution.load(Ordering::SeqCst) {
                Self::generate(command);
            }
            return Ok(RunOutcome::Exited { code: Some(0) });
        }

        if self.block_builds.load(Ordering::SeqCst) {
            self.build_blocked.notify_one();
            cancel.cancelled().await;
            return Ok(RunOutcome::Killed);
        }
        Self::compile(command);
        Ok(RunOutcome::Exited {
            code: Some(self.exit_code.load(Ordering::SeqCst)),
        })
    }

    async fn launch_detached(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        self.launched.lock().unwrap().push(command.clone());
        Ok(())
    }
}

// =============================================================================
// Store, catalog, events
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    pub state: Mutex<Option<LauncherState>>,
    /// Stall the next save so a later one could overtake it.
    pub stall_next_save: AtomicBool,
}

#[async_trait]
impl LauncherStore for MemoryStore {
    async fn load(&self) -> Result<Option<LauncherState>, StoreError> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn save(&self, state: &LauncherState) -> Result<(), StoreError> {
        if self.stall_next_save.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        *self.state.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub catalog: Mutex<Option<Catalog>>,
}

impl FakeCatalog {
    pub fn serve(&self, catalog: Catalog) {
        *self.catalog.lock().unwrap() = Some(catalog);
    }

    pub fn go_offline(&self) {
        *self.catalog.lock().unwrap() = None;
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch(&self) -> Result<(Catalog, String), CatalogError> {
        let catalog = self
            .catalog
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CatalogError::Request("offline".to_string()))?;
        let raw = serde_json::to_string(&catalog).unwrap();
        Ok((catalog, raw))
    }
}

#[derive(Default)]
pub struct RecordingEmitter {
    pub events: Mutex<Vec<InstallEvent>>,
}

impl RecordingEmitter {
    pub fn for_handle(&self, handle: EntityHandle) -> Vec<InstallEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.handle() == handle)
            .cloned()
            .collect()
    }

    pub fn states(&self, handle: EntityHandle) -> Vec<InstallationState> {
        self.for_handle(handle)
            .into_iter()
            .filter_map(|e| match e {
                InstallEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self, handle: EntityHandle) -> Vec<Progress> {
        self.for_handle(handle)
            .into_iter()
            .filter_map(|e| match e {
                InstallEvent::Progress { progress, .. } => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn outcomes(&self, handle: EntityHandle) -> Vec<PipelineOutcome> {
        self.for_handle(handle)
            .into_iter()
            .filter_map(|e| match e {
                InstallEvent::PipelineFinished { outcome, .. } => Some(outcome),
                _ => None,
            })
            .collect()
    }
}

impl InstallEventEmitter for RecordingEmitter {
    fn emit(&self, event: InstallEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// =============================================================================
// Harness
// =============================================================================

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, body) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_file(path: &Path, text: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

/// A checked-out engine on disk at `<parent>/HydraEngine`.
pub fn engine_checkout(parent: &Path) -> PathBuf {
    let engine = parent.join(layout::ENGINE_DIR_NAME);
    write_file(&layout::engine_descriptor(&engine), "workspace \"HydraEngine\"");
    write_file(&engine.join(layout::ENGINE_BUILD_SCRIPT), "-- build");
    engine
}

pub struct Harness {
    pub tmp: TempDir,
    pub transfer: Arc<FakeTransfer>,
    pub runner: Arc<FakeRunner>,
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<FakeCatalog>,
    pub events: Arc<RecordingEmitter>,
    pub orchestrator: InstallationOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(configure: impl FnOnce(&mut Settings)) -> Self {
        let tmp = TempDir::new().unwrap();
        let tool = tmp.path().join("tools").join("msbuild");
        write_file(&tool, "#!/bin/sh");

        let mut settings = Settings::with_defaults();
        settings.build_tool = Some(tool);
        configure(&mut settings);

        let transfer = Arc::new(FakeTransfer::default());
        transfer.set_files(
            ENGINE_URL,
            vec![
                ("premake.lua", b"workspace \"HydraEngine\"".to_vec()),
                ("build.lua", b"-- build".to_vec()),
            ],
        );
        transfer.set_files(
            LIBS_URL,
            vec![("Vulkan.zip", zip_bytes(&[("Vulkan/include/vulkan.h", "// vk")]))],
        );

        let runner = Arc::new(FakeRunner::default());
        let store = Arc::new(MemoryStore::default());
        let catalog = Arc::new(FakeCatalog::default());
        let events = Arc::new(RecordingEmitter::default());
        let orchestrator = Self::orchestrator(
            &tmp, &transfer, &runner, &store, &catalog, &events, settings,
        );

        Self {
            tmp,
            transfer,
            runner,
            store,
            catalog,
            events,
            orchestrator,
        }
    }

    fn orchestrator(
        tmp: &TempDir,
        transfer: &Arc<FakeTransfer>,
        runner: &Arc<FakeRunner>,
        store: &Arc<MemoryStore>,
        catalog: &Arc<FakeCatalog>,
        events: &Arc<RecordingEmitter>,
        settings: Settings,
    ) -> InstallationOrchestrator {
        let deps = OrchestratorDeps {
            transfer: Arc::clone(transfer) as Arc<dyn RemoteTransfer>,
            runner: Arc::clone(runner) as Arc<dyn ProcessRunner>,
            store: Arc::clone(store) as Arc<dyn LauncherStore>,
            catalog: Arc::clone(catalog) as Arc<dyn CatalogSource>,
            events: Arc::clone(events) as Arc<dyn InstallEventEmitter>,
        };
        InstallationOrchestrator::new(deps, settings, LauncherDirs::from_root(tmp.path().join("data")))
    }

    /// A second orchestrator over the same store, as after a restart.
    pub fn restart(&self) -> InstallationOrchestrator {
        Self::orchestrator(
            &self.tmp,
            &self.transfer,
            &self.runner,
            &self.store,
            &self.catalog,
            &self.events,
            Settings::with_defaults(),
        )
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn entity(&self, handle: EntityHandle) -> InstallableEntity {
        self.orchestrator.get(handle).unwrap()
    }

    pub fn state(&self, handle: EntityHandle) -> InstallationState {
        self.entity(handle).state
    }
}
