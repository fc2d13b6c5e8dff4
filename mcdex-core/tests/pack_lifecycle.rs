mod common;

use std::fs;
use std::sync::Arc;

use common::*;
use mcdex_common::model::{Manifest, ModReference, ModSpec, PackState, ReferenceKey, SourceKind};
use mcdex_common::McdexError;
use mcdex_core::pack::store::load_manifest;
use mcdex_core::Pack;
use tokio_util::sync::CancellationToken;

/// Project 10 ("alpha") depends on project 20 ("beta").
fn alpha_beta(server: &ArtifactServer) -> Arc<FakeRepository> {
    let repo = Arc::new(FakeRepository::default());
    repo.add_project(10, "alpha", "Alpha Mod", vec![remote_file(&server.base, 100, "alpha.jar", &[20])]);
    repo.add_project(20, "beta", "Beta Mod", vec![remote_file(&server.base, 200, "beta.jar", &[])]);
    repo
}

fn on_disk(pack: &Pack) -> Manifest {
    load_manifest(&pack.manifest_path()).unwrap()
}

#[tokio::test]
async fn create_pack_writes_empty_manifest() {
    let temp = tempfile::tempdir().unwrap();
    let repo = Arc::new(FakeRepository::default());
    let controller = controller(test_config(temp.path()), repo);

    let pack = controller.create("modpack1", "1.16.5", "36.2.0").unwrap();
    assert!(matches!(pack.state, PackState::ManifestLoaded));
    assert!(pack.mods_dir().is_dir());

    let manifest = on_disk(&pack);
    assert_eq!(manifest.name, "modpack1");
    assert_eq!(manifest.platform_version(), "1.16.5");
    assert_eq!(manifest.loader_version(), Some("36.2.0"));
    assert!(manifest.files.is_empty());
    assert!(manifest.created.is_some());

    let err = controller.create("modpack1", "1.16.5", "36.2.0").unwrap_err();
    assert!(matches!(err, McdexError::PackExists(_)));
}

#[tokio::test]
async fn explicit_url_registration_skips_the_repository() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["mod.jar"]));
    let repo = Arc::new(FakeRepository::default());
    let controller = controller(test_config(temp.path()), repo.clone());
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();

    let spec = ModSpec::parse(&server.url("/mod.jar"), None).unwrap();
    let report = controller.register_mod(&mut pack, &spec).await.unwrap();

    assert_eq!(repo.lookups(), 0);
    assert_eq!(report.installed, vec!["mod".to_string()]);
    assert!(matches!(pack.state, PackState::Ready));
    let manifest = on_disk(&pack);
    assert_eq!(manifest.files.len(), 1);
    let reference = &manifest.files[0];
    assert_eq!(reference.source, SourceKind::Explicit);
    assert_eq!(reference.name, "mod");
    assert!(!reference.dependency);
    assert_eq!(reference.dependencies, Some(vec![]));
    assert!(reference.installed);
    assert_eq!(fs::read(pack.mods_dir().join("mod.jar")).unwrap(), jar_body("mod.jar"));
}

#[tokio::test]
async fn explicit_request_wins_over_dependency() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["alpha.jar", "beta.jar"]));
    let repo = alpha_beta(&server);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();

    pack.manifest.files = vec![
        ModReference::repository(10, None),
        ModReference::repository(20, None),
    ];
    pack.save().unwrap();
    controller.install_mods(&mut pack).await.unwrap();

    let manifest = on_disk(&pack);
    let ids: Vec<_> = manifest.files.iter().map(|r| r.project_id).collect();
    assert_eq!(ids, vec![Some(10), Some(20)]);
    assert!(manifest.files.iter().all(|r| !r.dependency && r.installed));
}

#[tokio::test]
async fn registering_a_dependency_explicitly_promotes_it() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["alpha.jar", "beta.jar"]));
    let repo = alpha_beta(&server);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();

    controller
        .register_mod(&mut pack, &ModSpec::parse("alpha", None).unwrap())
        .await
        .unwrap();
    let beta = on_disk(&pack).get(&ReferenceKey::Project(20)).cloned().unwrap();
    assert!(beta.dependency);
    assert!(beta.installed);

    controller
        .register_mod(&mut pack, &ModSpec::parse("20", None).unwrap())
        .await
        .unwrap();
    let manifest = on_disk(&pack);
    assert_eq!(manifest.files.len(), 2);
    assert!(!manifest.get(&ReferenceKey::Project(20)).unwrap().dependency);

    let err = controller
        .register_mod(&mut pack, &ModSpec::parse("beta", None).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, McdexError::Duplicate(_)));
    assert!(pack.state.is_failed());
    assert_eq!(on_disk(&pack).files.len(), 2);
}

#[tokio::test]
async fn second_install_touches_neither_network_nor_repository() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["alpha.jar", "beta.jar"]));
    let repo = alpha_beta(&server);
    let controller = controller(test_config(temp.path()), repo.clone());
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();
    pack.manifest.files = vec![ModReference::repository(10, None)];
    pack.save().unwrap();

    let first = controller.install_mods(&mut pack).await.unwrap();
    assert_eq!(first.installed.len(), 2);
    let (hits, lookups) = (server.hits(), repo.lookups());
    let before = fs::read(pack.manifest_path()).unwrap();

    let mut reopened = controller.open(pack.root()).unwrap();
    let second = controller.install_mods(&mut reopened).await.unwrap();
    assert!(second.installed.is_empty());
    assert_eq!(second.unchanged, 2);
    assert_eq!(server.hits(), hits);
    assert_eq!(repo.lookups(), lookups);
    assert_eq!(fs::read(pack.manifest_path()).unwrap(), before);

    // Another pack with the same mods is served from the shared cache.
    let mut other = controller.create("modpack2", MC, FORGE).unwrap();
    other.manifest.files = on_disk(&pack)
        .files
        .into_iter()
        .map(|mut r| {
            r.installed = false;
            r
        })
        .collect();
    other.manifest.installed_files.clear();
    other.save().unwrap();
    let report = controller.install_mods(&mut other).await.unwrap();
    assert_eq!(report.installed.len(), 2);
    assert_eq!(server.hits(), hits);
}

#[tokio::test]
async fn partial_install_is_recorded_and_resumes() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["alpha.jar", "beta.jar"]));
    let repo = alpha_beta(&server);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();
    pack.manifest.files = vec![ModReference::repository(10, None)];
    pack.save().unwrap();

    server.break_path("/beta.jar");
    let err = controller.install_mods(&mut pack).await.unwrap_err();
    match &err {
        McdexError::PartialInstall { succeeded, failed } => {
            assert_eq!(succeeded, &vec!["Alpha Mod".to_string()]);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].0, "Beta Mod");
        }
        other => panic!("expected PartialInstall, got {other:?}"),
    }
    assert!(pack.state.is_failed());
    let manifest = on_disk(&pack);
    assert!(manifest.get(&ReferenceKey::Project(10)).unwrap().installed);
    assert!(!manifest.get(&ReferenceKey::Project(20)).unwrap().installed);
    assert!(!pack.mods_dir().join("beta.jar").exists());

    server.heal();
    let mut retry = controller.open(pack.root()).unwrap();
    let report = controller.install_mods(&mut retry).await.unwrap();
    assert_eq!(report.installed, vec!["Beta Mod".to_string()]);
    assert_eq!(report.unchanged, 1);
    assert!(retry.mods_dir().join("beta.jar").is_file());
}

#[tokio::test]
async fn removed_references_are_cleaned_up_but_user_files_stay() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["alpha.jar", "beta.jar"]));
    let repo = alpha_beta(&server);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();
    pack.manifest.files = vec![ModReference::repository(20, None)];
    pack.save().unwrap();
    controller.install_mods(&mut pack).await.unwrap();
    fs::write(pack.mods_dir().join("handmade.jar"), b"user content").unwrap();

    pack.manifest.remove_reference(&ReferenceKey::Project(20));
    pack.save().unwrap();
    let report = controller.install_mods(&mut pack).await.unwrap();

    assert_eq!(report.removed, vec!["beta.jar".to_string()]);
    assert!(!pack.mods_dir().join("beta.jar").exists());
    assert!(pack.mods_dir().join("handmade.jar").is_file());
    assert!(on_disk(&pack).installed_files.is_empty());
}

#[tokio::test]
async fn remote_pack_is_merged_with_overrides_and_profile() {
    let temp = tempfile::tempdir().unwrap();
    let remote_manifest = br#"{
        "manifestType": "minecraftModpack",
        "manifestVersion": 1,
        "name": "Upstream Pack",
        "version": "2.0",
        "author": "someone",
        "minecraft": {"version": "1.16.5", "modLoaders": [{"id": "forge-36.2.0", "primary": true}]},
        "files": [{"projectID": 10, "fileID": 100, "required": true}],
        "overrides": "overrides"
    }"#;
    let archive = zip_archive(&[
        ("manifest.json", remote_manifest),
        ("overrides/config/alpha.cfg", b"enabled=true"),
    ]);
    let mut files = jar_files(&["alpha.jar", "beta.jar"]);
    files.insert("/upstream.zip".to_string(), archive);
    let server = ArtifactServer::start(files);
    let repo = alpha_beta(&server);
    let config = test_config(temp.path());
    let profiles_path = config.launcher_profiles_path();
    let controller = controller(config, repo);

    let (pack, report) = controller
        .install_from_remote("remote1", &server.url("/upstream.zip"))
        .await
        .unwrap();

    assert_eq!(report.installed.len(), 2);
    assert!(matches!(pack.state, PackState::Ready));
    assert_eq!(
        fs::read_to_string(pack.root().join("config/alpha.cfg")).unwrap(),
        "enabled=true"
    );
    let manifest = on_disk(&pack);
    assert_eq!(manifest.name, "remote1");
    assert_eq!(manifest.version, "2.0");
    assert!(manifest.override_files.contains("config/alpha.cfg"));
    assert!(manifest.get(&ReferenceKey::Project(20)).unwrap().dependency);

    let profiles: serde_json::Value =
        serde_json::from_slice(&fs::read(profiles_path).unwrap()).unwrap();
    assert_eq!(
        profiles["profiles"]["remote1"]["lastVersionId"],
        "1.16.5-forge1.16.5-36.2.0"
    );
}

#[tokio::test]
async fn install_local_pack_writes_launcher_profile() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["beta.jar"]));
    let repo = alpha_beta(&server);
    let config = test_config(temp.path());
    let profiles_path = config.launcher_profiles_path();
    let controller = controller(config, repo);

    let dir = temp.path().join("elsewhere");
    let mut manifest = Manifest::new("local1", MC, FORGE);
    manifest.files.push(ModReference::by_slug("beta"));
    Pack::create(&dir, manifest).unwrap();

    let (pack, report) = controller.install_local(&dir).await.unwrap();
    assert_eq!(report.installed, vec!["Beta Mod".to_string()]);
    assert!(pack.mods_dir().join("beta.jar").is_file());
    let profiles: serde_json::Value =
        serde_json::from_slice(&fs::read(profiles_path).unwrap()).unwrap();
    assert_eq!(
        profiles["profiles"]["local1"]["gameDir"],
        pack.root().to_string_lossy().as_ref()
    );
}

#[tokio::test]
async fn ambiguous_slug_fails_resolution() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&[]));
    let repo = Arc::new(FakeRepository::default());
    repo.add_project(1, "jei-addons", "JEI Addons", vec![remote_file(&server.base, 1, "a.jar", &[])]);
    repo.add_project(2, "jei-tweaks", "JEI Tweaks", vec![remote_file(&server.base, 2, "b.jar", &[])]);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();
    let mut events = controller.subscribe();

    let err = controller
        .register_mod(&mut pack, &ModSpec::parse("jei", None).unwrap())
        .await
        .unwrap_err();
    match err {
        McdexError::AmbiguousReference { query, candidates } => {
            assert_eq!(query, "jei");
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected AmbiguousReference, got {other:?}"),
    }
    assert!(on_disk(&pack).files.is_empty());
    match &pack.state {
        PackState::Failed(reason) => {
            assert_eq!(reason.stage, mcdex_common::pipeline::PipelineStage::Resolve)
        }
        other => panic!("expected failed state, got {other}"),
    }
    let mut saw_stage_failed = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, mcdex_common::pipeline::PipelineEvent::StageFailed { .. }) {
            saw_stage_failed = true;
        }
    }
    assert!(saw_stage_failed);
}

#[tokio::test]
async fn incompatible_files_are_reported() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&[]));
    let repo = Arc::new(FakeRepository::default());
    let mut old = remote_file(&server.base, 5, "old.jar", &[]);
    old.game_versions = vec!["1.12.2".to_string()];
    repo.add_project(30, "oldmod", "Old Mod", vec![old]);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();

    let err = controller
        .register_mod(&mut pack, &ModSpec::parse("30", None).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, McdexError::NoCompatibleVersion { .. }));
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn cancelled_install_leaves_manifest_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["alpha.jar", "beta.jar"]));
    let repo = alpha_beta(&server);
    let cancel = CancellationToken::new();
    let controller = controller_with_cancel(test_config(temp.path()), repo, cancel.clone());
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();
    pack.manifest.files = vec![ModReference::repository(10, None)];
    pack.save().unwrap();
    let before = fs::read(pack.manifest_path()).unwrap();

    cancel.cancel();
    let err = controller.install_mods(&mut pack).await.unwrap_err();
    assert!(matches!(err, McdexError::Cancelled));
    assert_eq!(fs::read(pack.manifest_path()).unwrap(), before);
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn unresolvable_dependency_leaves_manifest_unchanged() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["alpha.jar"]));
    let repo = Arc::new(FakeRepository::default());
    repo.add_project(10, "alpha", "Alpha Mod", vec![remote_file(&server.base, 100, "alpha.jar", &[99])]);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();
    let before = fs::read(pack.manifest_path()).unwrap();

    let err = controller
        .register_mod(&mut pack, &ModSpec::parse("alpha", None).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, McdexError::NotFound(_)), "got {err:?}");
    assert!(pack.state.is_failed());
    assert!(pack.manifest.files.is_empty());
    assert_eq!(fs::read(pack.manifest_path()).unwrap(), before);
    assert_eq!(server.hits(), 0);

    // Nothing half-registered is left to trip up the next run.
    let mut reopened = controller.open(pack.root()).unwrap();
    let report = controller.install_mods(&mut reopened).await.unwrap();
    assert!(report.installed.is_empty());
    assert!(matches!(reopened.state, PackState::Ready));
}

#[tokio::test]
async fn repository_file_names_cannot_leave_the_mods_dir() {
    let temp = tempfile::tempdir().unwrap();
    let server = ArtifactServer::start(jar_files(&["escaped.jar"]));
    let repo = Arc::new(FakeRepository::default());
    let mut sneaky = remote_file(&server.base, 400, "escaped.jar", &[]);
    sneaky.file_name = "../../escaped.jar".to_string();
    repo.add_project(40, "sneaky", "Sneaky", vec![sneaky]);
    let controller = controller(test_config(temp.path()), repo);
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();

    let err = controller
        .register_mod(&mut pack, &ModSpec::parse("40", None).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, McdexError::InvalidReference(_)), "got {err:?}");
    assert!(on_disk(&pack).files.is_empty());
    assert!(!pack.root().join("../escaped.jar").exists());
    assert!(!pack.mods_dir().join("../../escaped.jar").exists());
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn remote_manifest_with_unsafe_paths_is_refused() {
    let temp = tempfile::tempdir().unwrap();
    let escaping_file = br#"{
        "manifestVersion": 1,
        "minecraft": {"version": "1.16.5", "modLoaders": [{"id": "forge-36.2.0", "primary": true}]},
        "files": [{"projectID": 10, "fileID": 100, "url": "http://127.0.0.1:9/a.jar", "filename": "../evil.jar"}]
    }"#;
    let absolute_overrides = br#"{
        "manifestVersion": 1,
        "minecraft": {"version": "1.16.5", "modLoaders": [{"id": "forge-36.2.0", "primary": true}]},
        "overrides": "/etc"
    }"#;
    let mut files = jar_files(&[]);
    files.insert("/escaping.zip".to_string(), zip_archive(&[("manifest.json", escaping_file)]));
    files.insert("/absolute.zip".to_string(), zip_archive(&[("manifest.json", absolute_overrides)]));
    let server = ArtifactServer::start(files);
    let config = test_config(temp.path());
    let packs_dir = config.packs_dir();
    let controller = controller(config, Arc::new(FakeRepository::default()));

    for (name, path) in [("remote1", "/escaping.zip"), ("remote2", "/absolute.zip")] {
        let err = controller
            .install_from_remote(name, &server.url(path))
            .await
            .unwrap_err();
        assert!(matches!(err, McdexError::InvalidReference(_)), "{path}: got {err:?}");
        assert!(!packs_dir.join(name).exists());
    }
    assert!(!packs_dir.join("evil.jar").exists());
}

#[tokio::test]
async fn unverified_files_are_never_removed_as_stale() {
    let temp = tempfile::tempdir().unwrap();
    let controller = controller(test_config(temp.path()), Arc::new(FakeRepository::default()));
    let mut pack = controller.create("modpack1", MC, FORGE).unwrap();
    fs::write(pack.mods_dir().join("user.jar"), b"user content").unwrap();
    pack.manifest.files = vec![ModReference::explicit("http://127.0.0.1:9/user.jar", "user")];
    pack.save().unwrap();

    let report = controller.install_mods(&mut pack).await.unwrap();
    assert_eq!(report.unchanged, 1);
    assert!(report.installed.is_empty());
    let manifest = on_disk(&pack);
    assert!(manifest.files[0].installed);
    assert!(manifest.installed_files.is_empty());

    pack.manifest.files.clear();
    pack.save().unwrap();
    let report = controller.install_mods(&mut pack).await.unwrap();
    assert!(report.removed.is_empty());
    assert_eq!(fs::read(pack.mods_dir().join("user.jar")).unwrap(), b"user content");
}
