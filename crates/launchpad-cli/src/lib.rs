//! Command-line front end for the launchpad installer.
//!
//! `main.rs` parses arguments and hands off to [`handlers`]; every handler
//! receives the [`CliContext`] composed in [`bootstrap`].
#![deny(unused_crate_dependencies)]

// Used by the binary only.
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{
    CatalogCommand, CatalogItemCommand, Commands, EngineCommand, ProjectCommand, SettingsCommand,
};
pub use error::CliError;
pub use parser::Cli;
