//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where adapters are wired together for the
//! CLI:
//! - `git` transfer, process runner and catalog client (via launchpad-runtime)
//! - JSON state file (via launchpad-runtime)
//! - Installation orchestrator (via launchpad-install)
//!
//! Command handlers receive the composed [`CliContext`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use launchpad_core::paths::{DirectoryCreationStrategy, data_root, ensure_directory, state_file_path};
use launchpad_core::{
    CatalogSource, InstallEventEmitter, LauncherStore, ProcessRunner, RemoteTransfer, Settings,
};
use launchpad_install::{InstallationOrchestrator, LauncherDirs, OrchestratorDeps};
use launchpad_runtime::{GitCliTransfer, HttpCatalogSource, JsonLauncherStore, SystemProcessRunner};
use tracing::{debug, warn};

use crate::presentation::OutcomeLog;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_root: PathBuf,
}

impl CliConfig {
    /// Use `override_root` when given, else the default data directory.
    pub fn resolve(override_root: Option<PathBuf>) -> Result<Self> {
        let data_root = match override_root {
            Some(root) => root,
            None => data_root()?,
        };
        Ok(Self { data_root })
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub orchestrator: InstallationOrchestrator,
    /// Last pipeline outcome per entity, fed by the orchestrator's events.
    pub outcomes: Arc<OutcomeLog>,
    pub config: CliConfig,
}

impl CliContext {
    pub const fn orchestrator(&self) -> &InstallationOrchestrator {
        &self.orchestrator
    }
}

/// Build the orchestrator, restore saved state and rediscover local plugins
/// and templates.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    ensure_directory(&config.data_root, DirectoryCreationStrategy::AutoCreate)
        .with_context(|| format!("cannot use data directory {}", config.data_root.display()))?;

    let store = Arc::new(JsonLauncherStore::new(state_file_path(&config.data_root)));
    let settings = match store.load().await {
        Ok(Some(saved)) => saved.settings,
        Ok(None) => Settings::with_defaults(),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable launcher state");
            Settings::with_defaults()
        }
    };

    let transfer = GitCliTransfer::discover(settings.git_program.as_deref())?;
    let catalog = HttpCatalogSource::new(settings.effective_catalog_url())?;

    let outcomes = Arc::new(OutcomeLog::default());
    let deps = OrchestratorDeps {
        transfer: Arc::new(transfer) as Arc<dyn RemoteTransfer>,
        runner: Arc::new(SystemProcessRunner::new()) as Arc<dyn ProcessRunner>,
        store: store as Arc<dyn LauncherStore>,
        catalog: Arc::new(catalog) as Arc<dyn CatalogSource>,
        events: Arc::clone(&outcomes) as Arc<dyn InstallEventEmitter>,
    };
    let orchestrator =
        InstallationOrchestrator::new(deps, settings, LauncherDirs::from_root(&config.data_root));

    if let Err(e) = orchestrator.load().await {
        warn!(error = %e, "saved engines and projects not restored");
    }
    let found = orchestrator.discover_local().await?;
    debug!(plugins = found.plugins, templates = found.templates, "local content discovered");

    Ok(CliContext {
        orchestrator,
        outcomes,
        config,
    })
}
