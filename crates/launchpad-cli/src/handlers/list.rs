//! List command handler.

use launchpad_core::{EntityDetails, EntityKind, InstallableEntity};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_separator, truncate_string};

const SECTIONS: [(EntityKind, &str); 4] = [
    (EntityKind::Engine, "Engines"),
    (EntityKind::Project, "Projects"),
    (EntityKind::Plugin, "Plugins"),
    (EntityKind::Template, "Templates"),
];

fn detail(entity: &InstallableEntity) -> String {
    match &entity.details {
        EntityDetails::Engine { commit_id, .. } => commit_id
            .as_deref()
            .map_or_else(|| "--".to_string(), |c| c.chars().take(10).collect()),
        EntityDetails::Project { engine_id, .. } => {
            engine_id.map_or_else(|| "unlinked".to_string(), |id| id.to_string())
        }
        EntityDetails::Plugin { description, .. } | EntityDetails::Template { description, .. } => {
            truncate_string(description, 30)
        }
    }
}

/// Print every entity grouped by kind, then the derived counts.
pub fn execute(ctx: &CliContext) -> Result<(), CliError> {
    let snapshot = ctx.orchestrator().snapshot();
    if snapshot.is_empty() {
        println!("Nothing registered yet.");
        println!("Use 'launchpad engine download <dir>' or 'launchpad catalog sync' to get started.");
        return Ok(());
    }

    for (kind, title) in SECTIONS {
        let mut entities: Vec<_> = snapshot.iter().filter(|(_, e)| e.kind() == kind).collect();
        if entities.is_empty() {
            continue;
        }
        entities.sort_by(|a, b| a.1.name.cmp(&b.1.name));

        println!("\n{title}:");
        println!("{:<24} {:<14} {:<32} Path", "Name", "State", "Detail");
        print_separator(100);
        for (_, entity) in entities {
            println!(
                "{:<24} {:<14} {:<32} {}",
                truncate_string(&entity.name, 23),
                entity.state.as_str(),
                detail(entity),
                entity.path.display()
            );
        }
    }

    let counts = ctx.orchestrator().counts();
    println!(
        "\n{}/{} engines, {}/{} plugins, {}/{} templates installed; {} projects",
        counts.engines_installed,
        counts.engines,
        counts.plugins_installed,
        counts.plugins,
        counts.templates_installed,
        counts.templates,
        counts.projects
    );
    Ok(())
}
