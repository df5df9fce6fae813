//! Core domain types and port definitions for launchpad.
//!
//! This crate has no adapters. It defines the installable entities, their
//! state machine and progress record, the on-disk layout, settings, and the
//! ports the orchestrator drives (remote transfer, process runner, store,
//! catalog, events).
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod errors;
pub mod layout;
pub mod paths;
pub mod ports;
pub mod settings;

pub use domain::{
    BuildConfiguration, EngineId, EntityDetails, EntityHandle, EntityKind, InstallableEntity,
    InstallationState, PersistedState, Progress, TransferUpdate,
};
pub use errors::{InstallError, InstallResult};
pub use paths::{DirectoryCreationStrategy, PathError, data_root, ensure_directory};
pub use ports::{
    Catalog, CatalogEntry, CatalogError, CatalogSource, CloneOutcome, CommandSpec, EngineRecord,
    InstallEvent, InstallEventEmitter, LauncherState, LauncherStore, PipelineKind,
    PipelineOutcome, ProcessError, ProcessRunner, ProjectRecord, RemoteTransfer, RunOptions,
    RunOutcome, StoreError, TransferError, TransferObserver,
};
pub use settings::{Settings, SettingsError, SettingsUpdate, validate_settings};

// Re-exported so adapters and the orchestrator share one token type.
pub use tokio_util::sync::CancellationToken;
