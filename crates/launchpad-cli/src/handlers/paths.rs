//! Paths command handler.

use launchpad_core::paths::state_file_path;

use crate::bootstrap::CliContext;

pub fn execute(ctx: &CliContext) {
    let dirs = ctx.orchestrator().dirs();
    println!("Data root:      {}", dirs.data_root.display());
    println!("State file:     {}", state_file_path(&dirs.data_root).display());
    println!("Plugins:        {}", dirs.plugins_dir.display());
    println!("Templates:      {}", dirs.templates_dir.display());
    println!("Catalog cache:  {}", dirs.catalog_cache.display());
}
