//! Command and subcommand definitions.

use std::path::PathBuf;

use clap::Subcommand;
use launchpad_core::BuildConfiguration;

#[derive(Subcommand)]
pub enum Commands {
    /// List engines, plugins, templates and projects with their state
    List,

    /// Show resolved launcher directories
    Paths,

    /// Manage engine instances
    #[command(subcommand)]
    Engine(EngineCommand),

    /// Build an engine or project by name. Ctrl-C cancels.
    Build {
        /// Engine or project name
        name: String,
        /// Build one configuration instead of every configured one
        #[arg(short, long)]
        config: Option<BuildConfiguration>,
    },

    /// Delete the files of an engine, plugin, template or project
    Delete {
        name: String,
        /// Also remove the entry from the launcher list
        #[arg(long)]
        remove: bool,
    },

    /// Remote catalog of plugins and templates
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// Catalog plugins
    #[command(subcommand)]
    Plugin(CatalogItemCommand),

    /// Catalog templates
    #[command(subcommand)]
    Template(CatalogItemCommand),

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Show or change launcher settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
pub enum EngineCommand {
    /// Register an existing engine checkout, or a directory to download into
    Add { dir: PathBuf },

    /// Download (and by default build) an engine into `<dir>/HydraEngine`
    Download { dir: PathBuf },
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// Fetch the remote catalog and merge it into the launcher list
    Sync,
}

#[derive(Subcommand)]
pub enum CatalogItemCommand {
    /// Download an entry listed in the catalog
    Install { name: String },
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project from an installed template
    Create {
        name: String,
        /// Template name
        #[arg(short, long)]
        template: String,
        /// Parent directory of the new project
        #[arg(short, long)]
        dir: PathBuf,
    },

    /// Register an existing project directory
    Add { dir: PathBuf },

    /// Set or clear a project's output directory
    BuildDir {
        name: String,
        /// Output directory; omit to restore the default
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the current settings
    Show,

    /// Change settings
    Set {
        #[arg(long)]
        auto_build: Option<bool>,
        #[arg(long)]
        run_after_build: Option<bool>,
        #[arg(long)]
        open_output_dir: Option<bool>,
        #[arg(long)]
        show_build_output: Option<bool>,
        #[arg(long)]
        fail_on_build_errors: Option<bool>,
        /// Build tool executable
        #[arg(long)]
        build_tool: Option<PathBuf>,
        /// Comma-separated configurations, e.g. `Debug,Release`
        #[arg(long, value_delimiter = ',')]
        configurations: Option<Vec<BuildConfiguration>>,
    },
}
