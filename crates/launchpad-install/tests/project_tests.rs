//! Project creation, project builds and launcher state persistence.

mod common;

use std::path::Path;

use common::{Harness, engine_checkout, write_file};
use launchpad_core::layout;
use launchpad_core::{
    BuildConfiguration, EntityDetails, EntityHandle, EntityKind, InstallError, InstallationState,
    PersistedState, SettingsUpdate,
};
use launchpad_install::ProjectFile;

/// Install a "Basic" template and an enabled-by-default "Physics" plugin,
/// and attach an engine checkout.
async fn seeded(h: &Harness) -> (EntityHandle, EntityHandle) {
    let template = h.orchestrator.dirs().templates_dir.join("Basic");
    write_file(&template.join("config.json"), r#"{"name": "Basic", "description": "empty"}"#);
    write_file(&template.join("thumbnail.jpg"), "jpg");
    write_file(&template.join("premake.lua"), "project \"PROJECT_NAME\"");
    write_file(
        &template.join("Source/Basic/Basic.cpp"),
        "class PROJECT_NAME : public Application {};",
    );
    write_file(&template.join("Resources/icon.png"), "png");

    let plugin = h.orchestrator.dirs().plugins_dir.join("Physics");
    write_file(&plugin.join("Physics.hplugin"), r#"{"enabledByDefault": true}"#);
    write_file(&plugin.join("Assets/shader.glsl"), "void main() {}");

    h.orchestrator.discover_local().await.unwrap();
    let engines = h.root().join("engines");
    let engine = h
        .orchestrator
        .attach_engine_directory(engine_checkout(&engines))
        .await
        .unwrap();
    let template = h.orchestrator.find(EntityKind::Template, "Basic").unwrap();
    (engine, template)
}

fn workspace(h: &Harness) -> std::path::PathBuf {
    let dir = h.root().join("projects");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_project_from_template() {
    let h = Harness::new();
    let (engine, template) = seeded(&h).await;
    let engine_id = h.entity(engine).engine_id();

    let project = h
        .orchestrator
        .create_project("My Game", template, &workspace(&h))
        .await
        .unwrap();

    let entity = h.entity(project);
    assert_eq!(entity.state, InstallationState::Installed);
    assert!(matches!(entity.details, EntityDetails::Project { engine_id: id, .. } if id == engine_id));

    let dir = entity.path;
    assert_eq!(read(&dir.join("premake.lua")), "project \"My Game\"");
    let cpp = dir.join("Source/MyGame/MyGame.cpp");
    assert_eq!(read(&cpp), "class MyGame : public Application {};");
    assert!(!dir.join("Source/Basic").exists());
    assert!(!dir.join("config.json").exists());
    assert!(!dir.join("thumbnail.jpg").exists());
    assert!(dir.join("Plugins/Physics/Physics.hplugin").is_file());

    let file = ProjectFile::read(&layout::project_file(&dir, "My Game")).unwrap();
    assert_eq!(file.engine_id, engine_id);
    assert!(file.saved_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_project_rejects_bad_input() {
    let h = Harness::new();
    let (engine, template) = seeded(&h).await;
    let parent = workspace(&h);

    assert!(matches!(
        h.orchestrator.create_project("  ", template, &parent).await,
        Err(InstallError::Invalid(_))
    ));
    assert!(matches!(
        h.orchestrator.create_project("Game", engine, &parent).await,
        Err(InstallError::Unsupported(_))
    ));
    assert!(matches!(
        h.orchestrator
            .create_project("Game", template, &h.root().join("missing"))
            .await,
        Err(InstallError::PathMissing(_))
    ));

    std::fs::create_dir_all(parent.join("Taken")).unwrap();
    assert!(matches!(
        h.orchestrator.create_project("Taken", template, &parent).await,
        Err(InstallError::Invalid(_))
    ));
    assert_eq!(h.orchestrator.counts().projects, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn project_build_stages_artifacts_and_launches() {
    let h = Harness::with_settings(|s| {
        s.run_after_build = Some(true);
        s.open_output_dir_after_build = Some(true);
    });
    let (_engine, template) = seeded(&h).await;
    let project = h
        .orchestrator
        .create_project("Arena", template, &workspace(&h))
        .await
        .unwrap();
    let dir = h.entity(project).path;

    h.orchestrator
        .request_build(project, Some(BuildConfiguration::Debug))
        .unwrap();
    h.orchestrator.wait_idle().await;

    assert_eq!(h.state(project), InstallationState::Installed);
    let generator = &h.runner.commands.lock().unwrap()[0];
    assert!(generator.args.iter().any(|a| a.starts_with("--enginePath=")));
    assert!(generator.args.contains(&"--includeSourceCode=false".to_string()));

    let output = layout::project_output_dir(&dir, None, BuildConfiguration::Debug);
    let executable = layout::project_executable(&output, "Arena");
    assert!(executable.is_file());
    assert!(!output.join("Arena.pdb").exists());
    assert!(output.join("Resources/icon.png").is_file());
    assert!(output.join("Plugins/Physics/Physics.hplugin").is_file());
    assert!(output.join("Plugins/Physics/Assets/shader.glsl").is_file());

    let launched = h.runner.launched.lock().unwrap();
    assert_eq!(launched.len(), 2);
    assert_eq!(launched[1].program, executable);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn project_build_honours_custom_build_dir() {
    let h = Harness::new();
    let (_engine, template) = seeded(&h).await;
    let project = h
        .orchestrator
        .create_project("Arena", template, &workspace(&h))
        .await
        .unwrap();
    let out = h.root().join("out");
    h.orchestrator
        .set_project_build_dir(project, Some(out.clone()))
        .await
        .unwrap();

    h.orchestrator
        .request_build(project, Some(BuildConfiguration::Release))
        .unwrap();
    h.orchestrator.wait_idle().await;

    let output = layout::project_output_dir(&h.entity(project).path, Some(&out), BuildConfiguration::Release);
    assert!(output.starts_with(&out));
    assert!(layout::project_executable(&output, "Arena").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn project_without_engine_cannot_build() {
    let h = Harness::new();
    let dir = workspace(&h).join("Orphan");
    write_file(&dir.join("premake.lua"), "project \"Orphan\"");
    let project = h.orchestrator.add_existing_project(&dir).await.unwrap();

    h.orchestrator.request_build(project, None).unwrap();
    h.orchestrator.wait_idle().await;

    assert_eq!(h.state(project), InstallationState::Failed);
    assert!(h.runner.commands.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn add_existing_project_reads_project_file() {
    let h = Harness::new();
    let dir = workspace(&h).join("Legacy");
    write_file(&dir.join("Source/Legacy/Legacy.cpp"), "");
    let mut file = ProjectFile::new(None, true);
    file.saved_at = None;
    file.write(&layout::project_file(&dir, "Legacy")).unwrap();

    let project = h.orchestrator.add_existing_project(&dir).await.unwrap();
    assert!(matches!(
        h.entity(project).details,
        EntityDetails::Project { include_source_code: true, .. }
    ));
    assert_eq!(h.orchestrator.add_existing_project(&dir).await.unwrap(), project);

    let not_a_project = workspace(&h).join("Photos");
    std::fs::create_dir_all(&not_a_project).unwrap();
    assert!(matches!(
        h.orchestrator.add_existing_project(&not_a_project).await,
        Err(InstallError::Invalid(_))
    ));
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn state_survives_a_restart() {
    let h = Harness::new();
    let (engine, template) = seeded(&h).await;
    let project = h
        .orchestrator
        .create_project("Arena", template, &workspace(&h))
        .await
        .unwrap();
    h.orchestrator
        .update_settings(&SettingsUpdate {
            run_after_build: Some(Some(true)),
            ..Default::default()
        })
        .unwrap();
    h.orchestrator.save().await.unwrap();

    let saved = h.store.state.lock().unwrap().clone().unwrap();
    assert_eq!(saved.engines.len(), 1);
    assert_eq!(saved.engines[0].state, PersistedState::Installed);
    assert_eq!(saved.projects.len(), 1);

    let restarted = h.restart();
    assert!(restarted.load().await.unwrap());
    assert!(restarted.settings().effective_run_after_build());

    let engine_path = h.entity(engine).path;
    let reloaded = restarted.find_by_path(EntityKind::Engine, &engine_path).unwrap();
    let reloaded = restarted.get(reloaded).unwrap();
    assert_eq!(reloaded.state, InstallationState::Installed);
    assert_eq!(reloaded.engine_id(), h.entity(engine).engine_id());
    assert!(restarted
        .find_by_path(EntityKind::Project, &h.entity(project).path)
        .is_some());

    // Loading twice does not duplicate entries.
    restarted.load().await.unwrap();
    assert_eq!(restarted.counts().engines, 1);
    assert_eq!(restarted.counts().projects, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn vanished_engine_loads_as_not_installed() {
    let h = Harness::new();
    let path = engine_checkout(&h.root().join("engines"));
    h.orchestrator.attach_engine_directory(&path).await.unwrap();
    std::fs::remove_dir_all(&path).unwrap();

    let restarted = h.restart();
    restarted.load().await.unwrap();
    let engine = restarted.find_by_path(EntityKind::Engine, &path).unwrap();
    assert_eq!(restarted.get(engine).unwrap().state, InstallationState::NotInstalled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_without_saved_state_reports_false() {
    let h = Harness::new();
    assert!(!h.orchestrator.load().await.unwrap());
    assert!(h.orchestrator.snapshot().is_empty());
}
