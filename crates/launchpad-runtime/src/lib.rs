//! OS-level adapters for launchpad.
//!
//! Implements the core ports against the real system: child processes,
//! the `git` command line, HTTP, zip archives and a JSON state file.
#![deny(unused_crate_dependencies)]

pub mod archive;
pub mod catalog;
pub mod process;
pub mod store;
pub mod toolchain;
pub mod transfer;

pub use archive::{ArchiveError, extract_archive, find_archives};
pub use catalog::HttpCatalogSource;
pub use process::{ExecOptions, ExecOutput, ExternalProcess, SystemProcessRunner, exec, exec_detached};
pub use store::JsonLauncherStore;
pub use toolchain::{directory_opener, find_build_tool};
pub use transfer::GitCliTransfer;

