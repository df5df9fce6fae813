//! Settings command handlers.

use std::path::PathBuf;

use launchpad_core::{BuildConfiguration, Settings, SettingsUpdate};

use crate::bootstrap::CliContext;
use crate::error::CliError;

fn print_settings(settings: &Settings) {
    let configs: Vec<&str> = settings
        .effective_build_configurations()
        .into_iter()
        .map(BuildConfiguration::as_str)
        .collect();
    println!("auto build after download: {}", settings.effective_auto_build());
    println!("build configurations:      {}", configs.join(", "));
    println!("fail on build errors:      {}", settings.effective_fail_on_build_errors());
    println!("show build output:         {}", settings.effective_show_build_output());
    println!("open output dir:           {}", settings.effective_open_output_dir());
    println!("run after build:           {}", settings.effective_run_after_build());
    println!(
        "build tool:                {}",
        settings
            .build_tool
            .as_ref()
            .map_or_else(|| "(search PATH)".to_string(), |p| p.display().to_string())
    );
    println!("engine repository:         {}", settings.effective_engine_repo_url());
    println!("engine libraries:          {}", settings.effective_engine_libs_repo_url());
    println!("catalog:                   {}", settings.effective_catalog_url());
}

pub fn show(ctx: &CliContext) {
    print_settings(&ctx.orchestrator().settings());
}

/// Flags given on the command line; unset flags leave the value alone.
#[derive(Debug, Default)]
pub struct SetArgs {
    pub auto_build: Option<bool>,
    pub run_after_build: Option<bool>,
    pub open_output_dir: Option<bool>,
    pub show_build_output: Option<bool>,
    pub fail_on_build_errors: Option<bool>,
    pub build_tool: Option<PathBuf>,
    pub configurations: Option<Vec<BuildConfiguration>>,
}

impl SetArgs {
    fn into_update(self) -> SettingsUpdate {
        SettingsUpdate {
            auto_build_after_download: self.auto_build.map(Some),
            run_after_build: self.run_after_build.map(Some),
            open_output_dir_after_build: self.open_output_dir.map(Some),
            show_build_output: self.show_build_output.map(Some),
            fail_on_build_errors: self.fail_on_build_errors.map(Some),
            build_tool: self.build_tool.map(Some),
            build_configurations: self.configurations.map(Some),
            ..SettingsUpdate::default()
        }
    }
}

pub async fn set(ctx: &CliContext, args: SetArgs) -> Result<(), CliError> {
    let settings = ctx.orchestrator().update_settings(&args.into_update())?;
    ctx.orchestrator().save().await?;
    print_settings(&settings);
    Ok(())
}
