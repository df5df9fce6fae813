//! CLI entry point.
//!
//! Wiring happens in `bootstrap`; this file only sets up logging, parses
//! arguments and dispatches to handlers.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use launchpad_cli::handlers::{build, catalog, engine, list, paths, project, settings};
use launchpad_cli::{
    CatalogCommand, CatalogItemCommand, Cli, CliConfig, CliContext, CliError, Commands, EngineCommand,
    ProjectCommand, SettingsCommand, bootstrap,
};
use launchpad_core::EntityKind;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "launchpad=debug" } else { "launchpad=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn dispatch(ctx: &CliContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::List => list::execute(ctx),
        Commands::Paths => {
            paths::execute(ctx);
            Ok(())
        }
        Commands::Engine(EngineCommand::Add { dir }) => engine::add(ctx, &dir).await,
        Commands::Engine(EngineCommand::Download { dir }) => engine::download(ctx, &dir).await,
        Commands::Build { name, config } => build::execute(ctx, &name, config).await,
        Commands::Delete { name, remove } => build::delete(ctx, &name, remove).await,
        Commands::Catalog(CatalogCommand::Sync) => catalog::sync(ctx).await,
        Commands::Plugin(CatalogItemCommand::Install { name }) => {
            catalog::install(ctx, EntityKind::Plugin, &name).await
        }
        Commands::Template(CatalogItemCommand::Install { name }) => {
            catalog::install(ctx, EntityKind::Template, &name).await
        }
        Commands::Project(ProjectCommand::Create {
            name,
            template,
            dir,
        }) => project::create(ctx, &name, &template, &dir).await,
        Commands::Project(ProjectCommand::Add { dir }) => project::add(ctx, &dir).await,
        Commands::Project(ProjectCommand::BuildDir { name, dir }) => {
            project::set_build_dir(ctx, &name, dir).await
        }
        Commands::Settings(SettingsCommand::Show) => {
            settings::show(ctx);
            Ok(())
        }
        Commands::Settings(SettingsCommand::Set {
            auto_build,
            run_after_build,
            open_output_dir,
            show_build_output,
            fail_on_build_errors,
            build_tool,
            configurations,
        }) => {
            let args = settings::SetArgs {
                auto_build,
                run_after_build,
                open_output_dir,
                show_build_output,
                fail_on_build_errors,
                build_tool,
                configurations,
            };
            settings::set(ctx, args).await
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = CliConfig::resolve(cli.data_dir)?;
    let ctx = bootstrap(config).await?;

    match dispatch(&ctx, command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("error: {err}");
            let code = u8::try_from(err.exit_code()).unwrap_or(1);
            Ok(ExitCode::from(code))
        }
    }
}
