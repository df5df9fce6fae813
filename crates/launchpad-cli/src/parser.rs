//! Root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Install, build and manage Hydra engine instances, plugins, templates
/// and projects.
#[derive(Parser)]
#[command(name = "launchpad")]
#[command(about = "Install and build Hydra engine instances and projects")]
#[command(version)]
pub struct Cli {
    /// Override the launcher data directory for this invocation
    #[arg(long = "data-dir", global = true, env = "LAUNCHPAD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
