//! Engine directories and projects: attaching, creating, adding.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use launchpad_core::layout::{
    self, ENGINE_DIR_NAME, PROJECT_FILE_EXTENSION, PROJECT_NAME_TOKEN, TEMPLATE_CONFIG,
    TEMPLATE_THUMBNAIL,
};
use launchpad_core::{
    EngineId, EntityDetails, EntityHandle, EntityKind, InstallError, InstallResult,
    InstallableEntity, InstallationState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::InstallationOrchestrator;
use crate::tree;

/// Contents of `<project>/<name>.hproject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub engine_id: Option<EngineId>,
    #[serde(default)]
    pub include_source_code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl ProjectFile {
    pub fn new(engine_id: Option<EngineId>, include_source_code: bool) -> Self {
        Self {
            engine_id,
            include_source_code,
            saved_at: Some(Utc::now()),
        }
    }

    pub fn read(path: &Path) -> InstallResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| InstallError::io(path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| InstallError::Invalid(format!("{}: {e}", path.display())))
    }

    pub fn write(&self, path: &Path) -> InstallResult<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| InstallError::Invalid(e.to_string()))?;
        fs::write(path, text).map_err(|e| InstallError::io(path.display(), e))
    }
}

fn project_entity(name: String, path: PathBuf, file: &ProjectFile) -> InstallableEntity {
    let mut entity = InstallableEntity::project(name, path, file.engine_id)
        .with_state(InstallationState::Installed);
    if let EntityDetails::Project {
        include_source_code,
        ..
    } = &mut entity.details
    {
        *include_source_code = file.include_source_code;
    }
    entity
}

/// Template sources are `Source/<template>/<template>.cpp`; a new project
/// gets `Source/<name>/<name>.cpp` with spaces stripped from the name.
fn instantiate_template(
    template_dir: &Path,
    template_name: &str,
    project_dir: &Path,
    project_name: &str,
    plugin_dirs: &[PathBuf],
) -> InstallResult<()> {
    let io = |path: &Path, e: std::io::Error| InstallError::io(path.display(), e);
    let normalized: String = project_name.chars().filter(|c| *c != ' ').collect();

    tree::copy_tree(template_dir, project_dir).map_err(|e| io(template_dir, e))?;
    for leftover in [TEMPLATE_THUMBNAIL, TEMPLATE_CONFIG, ".git"] {
        let path = project_dir.join(leftover);
        tree::remove_tree(&path).map_err(|e| io(&path, e))?;
    }

    let descriptor = layout::project_descriptor(project_dir);
    if descriptor.is_file() {
        tree::replace_in_file(&descriptor, PROJECT_NAME_TOKEN, project_name)
            .map_err(|e| io(&descriptor, e))?;
    }

    let source_root = project_dir.join("Source");
    let template_source = source_root.join(template_name);
    let template_cpp = template_source.join(format!("{template_name}.cpp"));
    if template_cpp.is_file() {
        tree::replace_in_file(&template_cpp, PROJECT_NAME_TOKEN, &normalized)
            .map_err(|e| io(&template_cpp, e))?;
        let renamed = template_source.join(format!("{normalized}.cpp"));
        fs::rename(&template_cpp, &renamed).map_err(|e| io(&template_cpp, e))?;
    }
    if template_source.is_dir() && template_name != normalized {
        let renamed = source_root.join(&normalized);
        fs::rename(&template_source, &renamed).map_err(|e| io(&template_source, e))?;
    }

    let project_plugins = project_dir.join("Plugins");
    fs::create_dir_all(&project_plugins).map_err(|e| io(&project_plugins, e))?;
    for plugin in plugin_dirs {
        let Some(name) = plugin.file_name() else { continue };
        tree::copy_tree(plugin, &project_plugins.join(name)).map_err(|e| io(plugin, e))?;
    }
    Ok(())
}

impl InstallationOrchestrator {
    /// Register an engine checkout chosen by the user.
    ///
    /// A valid checkout is registered as installed with its revision.
    /// Otherwise the engine is registered at `<dir>/HydraEngine`, ready to
    /// download.
    pub async fn attach_engine_directory(&self, dir: impl Into<PathBuf>) -> InstallResult<EntityHandle> {
        let dir = dir.into();
        let path = if layout::is_valid_engine_directory(&dir) {
            dir
        } else {
            dir.join(ENGINE_DIR_NAME)
        };
        let valid = layout::is_valid_engine_directory(&path);

        if let Some(existing) = self.ctx.registry.find_by_path(EntityKind::Engine, &path) {
            return Ok(existing);
        }

        let id = self.ctx.registry.allocate_engine_id();
        let mut entity = InstallableEntity::engine(id, &path);
        if valid {
            entity.state = InstallationState::Installed;
            match self.ctx.deps.transfer.current_commit_id(&path).await {
                Ok(revision) => {
                    entity.details = EntityDetails::Engine {
                        id,
                        commit_id: Some(revision),
                    };
                }
                Err(e) => debug!(path = %path.display(), error = %e, "engine revision unknown"),
            }
        }
        info!(engine = %id, path = %path.display(), installed = valid, "engine attached");
        let handle = self.ctx.registry.insert(entity);
        self.ctx.persist().await;
        Ok(handle)
    }

    /// Create a project named `name` under `parent_dir` from an installed
    /// template.
    pub async fn create_project(
        &self,
        name: &str,
        template: EntityHandle,
        parent_dir: &Path,
    ) -> InstallResult<EntityHandle> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(InstallError::Invalid(format!("invalid project name '{name}'")));
        }
        let template = self.ctx.registry.get(template)?;
        if template.kind() != EntityKind::Template {
            return Err(InstallError::Unsupported(format!("{} is not a template", template.name)));
        }
        if template.state != InstallationState::Installed {
            return Err(InstallError::Invalid(format!("template {} is not installed", template.name)));
        }
        if !parent_dir.is_dir() {
            return Err(InstallError::PathMissing(parent_dir.to_path_buf()));
        }
        let project_dir = parent_dir.join(name);
        if project_dir.exists() {
            return Err(InstallError::Invalid(format!(
                "project directory {} already exists",
                project_dir.display()
            )));
        }

        let plugin_dirs: Vec<PathBuf> = self
            .ctx
            .registry
            .snapshot_kind(EntityKind::Plugin)
            .into_iter()
            .filter(|(_, p)| p.state == InstallationState::Installed)
            .filter(|(_, p)| matches!(p.details, EntityDetails::Plugin { enabled_by_default: true, .. }))
            .map(|(_, p)| p.path)
            .collect();
        let engine_id = self
            .ctx
            .registry
            .first_engine()
            .and_then(|(_, engine)| engine.engine_id());

        let file = ProjectFile::new(engine_id, false);
        let (template_dir, template_name) = (template.path.clone(), template.name.clone());
        let (dir, project_name, project_file) = (project_dir.clone(), name.to_string(), file.clone());
        let created = tree::blocking(move || {
            instantiate_template(&template_dir, &template_name, &dir, &project_name, &plugin_dirs)?;
            project_file.write(&layout::project_file(&dir, &project_name))
        })
        .await;

        if let Err(err) = created {
            warn!(project = %name, error = %err, "project creation failed, removing partial copy");
            let dir = project_dir.clone();
            if let Err(cleanup) = tree::blocking(move || {
                tree::remove_tree(&dir).map_err(|e| InstallError::io(dir.display(), e))
            })
            .await
            {
                warn!(path = %project_dir.display(), error = %cleanup, "partial project left on disk");
            }
            return Err(err);
        }

        info!(project = %name, template = %template.name, path = %project_dir.display(), "project created");
        let handle = self
            .ctx
            .registry
            .insert(project_entity(name.to_string(), project_dir, &file));
        self.ctx.persist().await;
        Ok(handle)
    }

    /// Register an existing project directory.
    ///
    /// The directory must contain a generator descriptor or a `Source`
    /// folder. Engine linkage is read from the project file when present.
    pub async fn add_existing_project(&self, dir: &Path) -> InstallResult<EntityHandle> {
        if !dir.is_dir() {
            return Err(InstallError::PathMissing(dir.to_path_buf()));
        }
        if !layout::project_descriptor(dir).is_file() && !dir.join("Source").is_dir() {
            return Err(InstallError::Invalid(format!(
                "{} does not look like a project",
                dir.display()
            )));
        }
        if let Some(existing) = self.ctx.registry.find_by_path(EntityKind::Project, dir) {
            return Ok(existing);
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| InstallError::Invalid(dir.display().to_string()))?;

        let project_file = layout::project_file(dir, &name);
        let file = if project_file.is_file() {
            ProjectFile::read(&project_file).unwrap_or_else(|e| {
                warn!(path = %project_file.display(), error = %e, "ignoring unreadable project file");
                ProjectFile::new(None, false)
            })
        } else {
            debug!(project = %name, "no .{PROJECT_FILE_EXTENSION} file, project is unlinked");
            ProjectFile::new(None, false)
        };

        info!(project = %name, path = %dir.display(), "project added");
        let handle = self
            .ctx
            .registry
            .insert(project_entity(name, dir.to_path_buf(), &file));
        self.ctx.persist().await;
        Ok(handle)
    }

    /// Set or clear a project's custom output directory.
    pub async fn set_project_build_dir(
        &self,
        handle: EntityHandle,
        build_dir: Option<PathBuf>,
    ) -> InstallResult<()> {
        self.ctx.registry.update(handle, |e| match &mut e.details {
            EntityDetails::Project { build_dir: slot, .. } => {
                *slot = build_dir;
                Ok(())
            }
            _ => Err(InstallError::Unsupported(format!("{} is not a project", e.name))),
        })??;
        self.ctx.persist().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn template_is_instantiated_with_project_name() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("Templates").join("Basic");
        write(&template.join("premake.lua"), "project \"PROJECT_NAME\"");
        write(&template.join(TEMPLATE_CONFIG), "{}");
        write(&template.join(TEMPLATE_THUMBNAIL), "jpg");
        write(&template.join(".git").join("HEAD"), "ref");
        write(
            &template.join("Source").join("Basic").join("Basic.cpp"),
            "class PROJECT_NAME {};",
        );

        let plugin = tmp.path().join("Plugins").join("Physics");
        write(&layout::plugin_descriptor(&plugin, "Physics"), "{}");

        let project = tmp.path().join("work").join("My Game");
        instantiate_template(&template, "Basic", &project, "My Game", &[plugin]).unwrap();

        assert_eq!(
            fs::read_to_string(project.join("premake.lua")).unwrap(),
            "project \"My Game\""
        );
        let cpp = project.join("Source").join("MyGame").join("MyGame.cpp");
        assert_eq!(fs::read_to_string(cpp).unwrap(), "class MyGame {};");
        assert!(!project.join("Source").join("Basic").exists());
        assert!(!project.join(TEMPLATE_CONFIG).exists());
        assert!(!project.join(TEMPLATE_THUMBNAIL).exists());
        assert!(!project.join(".git").exists());
        assert!(layout::plugin_descriptor(&project.join("Plugins").join("Physics"), "Physics").is_file());
    }

    #[test]
    fn project_file_round_trips_linkage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Game.hproject");
        ProjectFile::new(Some(EngineId(3)), true).write(&path).unwrap();

        let file = ProjectFile::read(&path).unwrap();
        assert_eq!(file.engine_id, Some(EngineId(3)));
        assert!(file.include_source_code);
        assert!(file.saved_at.is_some());
    }

    #[test]
    fn project_file_tolerates_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Game.hproject");
        fs::write(&path, "{}").unwrap();
        let file = ProjectFile::read(&path).unwrap();
        assert_eq!(file.engine_id, None);
        assert!(file.saved_at.is_none());
    }
}
