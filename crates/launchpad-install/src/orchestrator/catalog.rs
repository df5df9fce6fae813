//! Remote catalog sync and local discovery of plugins and templates.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use launchpad_core::layout::{self, TEMPLATE_CONFIG, TEMPLATE_THUMBNAIL};
use launchpad_core::{
    Catalog, CatalogEntry, CatalogError, EntityDetails, EntityHandle, EntityKind, InstallError,
    InstallResult, InstallableEntity, InstallationState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Context, InstallationOrchestrator};
use crate::tree;

/// What one catalog sync changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSyncReport {
    pub plugins_added: usize,
    pub templates_added: usize,
    pub templates_updated: usize,
    /// Entries skipped because their name is not a plain directory name.
    pub rejected: usize,
    /// A cached manifest was loaded.
    pub from_cache: bool,
    /// The remote manifest was fetched.
    pub refreshed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub plugins: usize,
    pub templates: usize,
}

/// `<plugin>/<plugin>.hplugin`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PluginDescriptor {
    #[serde(default)]
    description: String,
    #[serde(default, alias = "URL")]
    url: Option<String>,
    #[serde(default)]
    enabled_by_default: bool,
}

/// `<template>/config.json`
#[derive(Debug, Default, Deserialize)]
struct TemplateConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "URL")]
    url: Option<String>,
}

/// Parse a descriptor, falling back to defaults for malformed files.
fn parse_lenient<T: Default + for<'de> Deserialize<'de>>(path: &Path, text: &str) -> T {
    serde_json::from_str(text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "malformed descriptor, using defaults");
        T::default()
    })
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn plugin_entity(name: String, path: PathBuf, desc: PluginDescriptor) -> InstallableEntity {
    let mut entity = InstallableEntity::plugin(name, path, desc.description)
        .with_state(InstallationState::Installed);
    if let EntityDetails::Plugin {
        enabled_by_default, ..
    } = &mut entity.details
    {
        *enabled_by_default = desc.enabled_by_default;
    }
    entity.source_url = desc.url;
    entity
}

fn template_entity(dir: PathBuf, config: TemplateConfig) -> Option<InstallableEntity> {
    let name = config.name.filter(|n| !n.is_empty()).or_else(|| dir_name(&dir))?;
    let thumbnail = dir.join(TEMPLATE_THUMBNAIL);
    let mut entity = InstallableEntity::template(name, &dir, config.description)
        .with_state(InstallationState::Installed);
    if let EntityDetails::Template { thumbnail: slot, .. } = &mut entity.details {
        *slot = thumbnail.is_file().then_some(thumbnail);
    }
    entity.source_url = config.url;
    Some(entity)
}

fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Installed plugins: every `<dir>/<n>/<n>.hplugin`.
fn scan_plugins(dir: &Path) -> io::Result<Vec<InstallableEntity>> {
    let mut found = Vec::new();
    for path in subdirectories(dir)? {
        let Some(name) = dir_name(&path) else { continue };
        let descriptor = layout::plugin_descriptor(&path, &name);
        if !descriptor.is_file() {
            continue;
        }
        let desc = parse_lenient(&descriptor, &fs::read_to_string(&descriptor)?);
        found.push(plugin_entity(name, path, desc));
    }
    Ok(found)
}

/// Installed templates: every `<dir>/*/config.json`.
fn scan_templates(dir: &Path) -> io::Result<Vec<InstallableEntity>> {
    let mut found = Vec::new();
    for path in subdirectories(dir)? {
        let config_path = path.join(TEMPLATE_CONFIG);
        if !config_path.is_file() {
            continue;
        }
        let config = parse_lenient(&config_path, &fs::read_to_string(&config_path)?);
        found.extend(template_entity(path, config));
    }
    Ok(found)
}

/// Insert a discovered entity, or mark the existing entry of the same name
/// as installed at the discovered location. Entities with a running
/// pipeline are left alone.
fn register_discovered(ctx: &Context, found: InstallableEntity) {
    let kind = found.kind();
    let Some(handle) = ctx.registry.find_by_name(kind, &found.name) else {
        debug!(%kind, entity = %found.name, "discovered");
        ctx.registry.insert(found);
        return;
    };
    let _ = ctx.registry.update(handle, |e| {
        if e.state.is_active() {
            return;
        }
        e.state = InstallationState::Installed;
        e.path = found.path;
        e.details = found.details;
        if found.source_url.is_some() {
            e.source_url = found.source_url;
        }
    });
}

/// True when `name` is exactly one normal path component.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn merge_catalog(ctx: &Context, catalog: &Catalog, report: &mut CatalogSyncReport) {
    let mut accepted = |entry: &CatalogEntry| {
        if is_plain_name(&entry.name) {
            return true;
        }
        warn!(name = %entry.name, "ignoring catalog entry with an unusable name");
        report.rejected += 1;
        false
    };
    let plugins: Vec<_> = catalog.plugins.iter().filter(|&e| accepted(e)).collect();
    let templates: Vec<_> = catalog.templates.iter().filter(|&e| accepted(e)).collect();

    for entry in plugins {
        if let Some(handle) = ctx.registry.find_by_name(EntityKind::Plugin, &entry.name) {
            let _ = ctx.registry.update(handle, |e| {
                if e.source_url.is_none() {
                    e.source_url = Some(entry.url.clone());
                }
            });
            continue;
        }
        let path = ctx.dirs.plugins_dir.join(&entry.name);
        ctx.registry.insert(
            InstallableEntity::plugin(&entry.name, path, &entry.description)
                .with_source_url(&entry.url),
        );
        report.plugins_added += 1;
    }

    for entry in templates {
        if let Some(handle) = ctx.registry.find_by_name(EntityKind::Template, &entry.name) {
            let _ = ctx.registry.update(handle, |e| {
                if let EntityDetails::Template { description, .. } = &mut e.details {
                    description.clone_from(&entry.description);
                }
                e.source_url = Some(entry.url.clone());
            });
            report.templates_updated += 1;
            continue;
        }
        let path = ctx.dirs.templates_dir.join(&entry.name);
        ctx.registry.insert(
            InstallableEntity::template(&entry.name, path, &entry.description)
                .with_source_url(&entry.url),
        );
        report.templates_added += 1;
    }
}

async fn write_cache(path: &Path, raw: &str) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CatalogError::Cache(e.to_string()))?;
    }
    tokio::fs::write(path, raw)
        .await
        .map_err(|e| CatalogError::Cache(e.to_string()))
}

/// Re-read the descriptor of a freshly downloaded plugin or template.
pub(super) async fn refresh_metadata(ctx: &Context, handle: EntityHandle) -> InstallResult<()> {
    let entity = ctx.registry.get(handle)?;
    let descriptor = match entity.kind() {
        EntityKind::Plugin => layout::plugin_descriptor(&entity.path, &entity.name),
        EntityKind::Template => entity.path.join(TEMPLATE_CONFIG),
        EntityKind::Engine | EntityKind::Project => return Ok(()),
    };
    let text = tokio::fs::read_to_string(&descriptor)
        .await
        .map_err(|e| InstallError::io(descriptor.display(), e))?;

    let refreshed = match entity.kind() {
        EntityKind::Plugin => {
            plugin_entity(entity.name, entity.path, parse_lenient(&descriptor, &text))
        }
        _ => {
            let mut config: TemplateConfig = parse_lenient(&descriptor, &text);
            config.name = Some(entity.name);
            template_entity(entity.path, config)
                .ok_or_else(|| InstallError::Invalid(descriptor.display().to_string()))?
        }
    };
    ctx.registry.update(handle, |e| {
        e.details = refreshed.details;
        if e.source_url.is_none() {
            e.source_url = refreshed.source_url;
        }
    })
}

impl InstallationOrchestrator {
    /// Merge the cached catalog, then the freshly fetched one.
    ///
    /// A failed fetch is tolerated when a cached copy was available.
    pub async fn sync_catalog(&self) -> InstallResult<CatalogSyncReport> {
        let ctx = &self.ctx;
        let cache = &ctx.dirs.catalog_cache;
        let mut report = CatalogSyncReport::default();

        match tokio::fs::read_to_string(cache).await {
            Ok(text) => match Catalog::from_json(&text) {
                Ok(catalog) => {
                    merge_catalog(ctx, &catalog, &mut report);
                    report.from_cache = true;
                }
                Err(e) => warn!(path = %cache.display(), error = %e, "ignoring unreadable catalog cache"),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %cache.display(), error = %e, "could not read catalog cache"),
        }

        match ctx.deps.catalog.fetch().await {
            Ok((catalog, raw)) => {
                if let Err(e) = write_cache(cache, &raw).await {
                    warn!(path = %cache.display(), error = %e, "could not write catalog cache");
                }
                merge_catalog(ctx, &catalog, &mut report);
                report.refreshed = true;
            }
            Err(e) if report.from_cache => {
                warn!(error = %e, "catalog refresh failed, using cached copy");
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            plugins_added = report.plugins_added,
            templates_added = report.templates_added,
            templates_updated = report.templates_updated,
            refreshed = report.refreshed,
            "catalog synced"
        );
        Ok(report)
    }

    /// Register the plugins and templates already present on disk.
    pub async fn discover_local(&self) -> InstallResult<DiscoveryReport> {
        let plugins_dir = self.ctx.dirs.plugins_dir.clone();
        let templates_dir = self.ctx.dirs.templates_dir.clone();
        let (plugins, templates) = tree::blocking(move || {
            let plugins = scan_plugins(&plugins_dir)
                .map_err(|e| InstallError::io(plugins_dir.display(), e))?;
            let templates = scan_templates(&templates_dir)
                .map_err(|e| InstallError::io(templates_dir.display(), e))?;
            Ok((plugins, templates))
        })
        .await?;

        let report = DiscoveryReport {
            plugins: plugins.len(),
            templates: templates.len(),
        };
        for entity in plugins.into_iter().chain(templates) {
            register_discovered(&self.ctx, entity);
        }
        info!(plugins = report.plugins, templates = report.templates, "local discovery finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plugin_descriptor_uses_launcher_keys() {
        let text = r#"{"name": "Physics", "description": "bodies", "URL": "https://x/p", "enabledByDefault": true}"#;
        let desc: PluginDescriptor = parse_lenient(Path::new("p.hplugin"), text);
        assert!(desc.enabled_by_default);
        assert_eq!(desc.url.as_deref(), Some("https://x/p"));
        assert_eq!(desc.description, "bodies");
    }

    #[test]
    fn malformed_descriptor_falls_back_to_defaults() {
        let desc: PluginDescriptor = parse_lenient(Path::new("p.hplugin"), "{not json");
        assert!(!desc.enabled_by_default);
        assert!(desc.description.is_empty());
    }

    #[test]
    fn scans_only_directories_with_descriptors() {
        let tmp = TempDir::new().unwrap();
        let physics = tmp.path().join("Physics");
        fs::create_dir_all(&physics).unwrap();
        fs::write(
            layout::plugin_descriptor(&physics, "Physics"),
            r#"{"description": "bodies", "enabledByDefault": true}"#,
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("Stray")).unwrap();

        let found = scan_plugins(tmp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Physics");
        assert_eq!(found[0].state, InstallationState::Installed);
        assert!(matches!(
            found[0].details,
            EntityDetails::Plugin {
                enabled_by_default: true,
                ..
            }
        ));
    }

    #[test]
    fn template_name_comes_from_config() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("empty-template");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(TEMPLATE_CONFIG), r#"{"name": "Empty", "description": "blank"}"#).unwrap();
        fs::write(dir.join(TEMPLATE_THUMBNAIL), "jpg").unwrap();

        let found = scan_templates(tmp.path()).unwrap();
        assert_eq!(found[0].name, "Empty");
        assert_eq!(found[0].description(), Some("blank"));
        assert!(matches!(
            &found[0].details,
            EntityDetails::Template { thumbnail: Some(_), .. }
        ));
    }

    #[test]
    fn only_single_component_names_are_plain() {
        assert!(is_plain_name("Physics"));
        assert!(is_plain_name("Third Person"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("../.."));
        assert!(!is_plain_name("a/b"));
        assert!(!is_plain_name("/etc"));
    }

    #[test]
    fn missing_directories_scan_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_plugins(&tmp.path().join("none")).unwrap().is_empty());
        assert!(scan_templates(&tmp.path().join("none")).unwrap().is_empty());
    }
}
