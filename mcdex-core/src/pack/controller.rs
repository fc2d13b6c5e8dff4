// mcdex-core/src/pack/controller.rs
// Drives a pack through resolve -> install -> ready and records which stage
// failed when something goes wrong.

use std::path::Path;
use std::sync::Arc;

use mcdex_aio::extract::extract_zip_async;
use mcdex_aio::fs::read_to_bytes_async;
use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::mod_ref::file_name_from_url;
use mcdex_common::model::{DownloadDescriptor, Manifest, ModSpec, PackState, MANIFEST_FILENAME};
use mcdex_common::pipeline::{PipelineEvent, PipelineStage};
use mcdex_common::Config;
use mcdex_net::{validate_url, verify_content_type, DownloadEngine, HttpRepository, ModRepository};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::Pack;
use crate::install::{InstallReport, Installer};
use crate::launcher::{LauncherProfile, LauncherProfileSink, LauncherProfilesFile};
use crate::resolve::{target_of, ModResolver};
use crate::server::{ServerProvisioner, ServerReport};

const EVENT_CHANNEL_CAPACITY: usize = 512;
const PACK_ARCHIVE_TYPES: &[&str] = &["zip", "jar"];

/// Entry point for every pack command. Holds the components and the shared
/// cancellation token; nothing here is process-global.
pub struct PackController {
    config: Config,
    engine: DownloadEngine,
    resolver: ModResolver,
    installer: Installer,
    server: ServerProvisioner,
    launcher: Arc<dyn LauncherProfileSink>,
    events: broadcast::Sender<PipelineEvent>,
    cancel: CancellationToken,
}

fn validate_pack_name(name: &str) -> Result<()> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(McdexError::Validation(format!("invalid pack name '{name}'")));
    }
    Ok(())
}

impl PackController {
    pub fn new(
        config: Config,
        repository: Arc<dyn ModRepository>,
        launcher: Arc<dyn LauncherProfileSink>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let engine = DownloadEngine::new(&config, cancel.clone())?.with_events(events.clone());
        let resolver = ModResolver::new(repository, config.max_workers).with_events(events.clone());
        let installer = Installer::new(engine.clone(), config.max_workers).with_events(events.clone());
        let server = ServerProvisioner::new(engine.clone(), &config);
        Ok(Self {
            config,
            engine,
            resolver,
            installer,
            server,
            launcher,
            events,
            cancel,
        })
    }

    /// Production wiring: HTTP repository and the launcher's profile file.
    pub fn from_config(config: Config, cancel: CancellationToken) -> Result<Self> {
        let repository = Arc::new(HttpRepository::new(&config)?);
        let launcher = Arc::new(LauncherProfilesFile::new(config.launcher_profiles_path()));
        Self::new(config, repository, launcher, cancel)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &DownloadEngine {
        &self.engine
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }

    /// Records the failure on the pack and hands the error back untouched.
    fn fail(&self, pack: &mut Pack, stage: PipelineStage, err: McdexError) -> McdexError {
        error!("Pack '{}' failed during {}: {}", pack.name(), stage, err);
        self.emit(PipelineEvent::stage_failed(pack.name().to_string(), stage, &err));
        if let Err(e) = pack.state.fail(stage, err.clone()) {
            debug!("Pack state not updated: {}", e);
        }
        err
    }

    fn fail_unopened(&self, pack: &str, stage: PipelineStage, err: McdexError) -> McdexError {
        error!("Pack '{}' failed during {}: {}", pack, stage, err);
        self.emit(PipelineEvent::stage_failed(pack.to_string(), stage, &err));
        err
    }

    fn persist(&self, pack: &mut Pack) -> Result<()> {
        pack.save().map_err(|e| self.fail(pack, PipelineStage::Persist, e))
    }

    /// Creates `<packs>/<name>` with an empty manifest.
    #[instrument(skip(self))]
    pub fn create(&self, name: &str, minecraft_version: &str, forge_version: &str) -> Result<Pack> {
        validate_pack_name(name).map_err(|e| self.fail_unopened(name, PipelineStage::Create, e))?;
        let root = self.config.pack_dir(name);
        let manifest = Manifest::new(name, minecraft_version, forge_version);
        let pack = Pack::create(&root, manifest)
            .map_err(|e| self.fail_unopened(name, PipelineStage::Create, e))?;
        info!("Created pack '{}' at {}", name, pack.root().display());
        Ok(pack)
    }

    pub fn open(&self, dir: &Path) -> Result<Pack> {
        Pack::open(dir).map_err(|e| {
            self.fail_unopened(&dir.display().to_string(), PipelineStage::LoadManifest, e)
        })
    }

    /// Resolving -> Installing -> Ready, persisting after each stage.
    async fn resolve_and_install(&self, pack: &mut Pack) -> Result<InstallReport> {
        pack.state.transition(PackState::Resolving)?;
        let report = self
            .resolver
            .resolve_manifest(&mut pack.manifest, &self.cancel)
            .await
            .map_err(|e| self.fail(pack, PipelineStage::Resolve, e))?;
        debug!("Resolution report: {:?}", report);
        self.persist(pack)?;
        self.install_resolved(pack).await
    }

    /// Installing -> Ready for a manifest that has just been resolved.
    async fn install_resolved(&self, pack: &mut Pack) -> Result<InstallReport> {
        pack.state.transition(PackState::Installing)?;
        let mods_dir = pack.mods_dir();
        let outcome = self
            .installer
            .install(&mut pack.manifest, &mods_dir, &self.cancel)
            .await;
        // Whatever made it to disk is recorded before any failure surfaces.
        self.persist(pack)?;
        let report = outcome.map_err(|e| self.fail(pack, PipelineStage::Install, e))?;

        self.emit(PipelineEvent::InstallFinished {
            pack: pack.name().to_string(),
            installed: report.installed.len(),
            unchanged: report.unchanged,
            failed: report.failed.len(),
        });
        let report = report
            .into_result()
            .map_err(|e| self.fail(pack, PipelineStage::Install, e))?;
        pack.state.transition(PackState::Ready)?;
        Ok(report)
    }

    /// Resolves and installs everything the manifest lists.
    #[instrument(skip_all, fields(pack = %pack.name()))]
    pub async fn install_mods(&self, pack: &mut Pack) -> Result<InstallReport> {
        self.resolve_and_install(pack).await
    }

    /// Adds one mod (and whatever it depends on) and installs it. The new
    /// entry and its dependencies reach the manifest together or not at all.
    #[instrument(skip_all, fields(pack = %pack.name(), spec = %spec))]
    pub async fn register_mod(&self, pack: &mut Pack, spec: &ModSpec) -> Result<InstallReport> {
        let target = target_of(&pack.manifest);
        let reference = match self.resolver.resolve_spec(spec, &target).await {
            Ok(reference) => reference,
            Err(e) => return Err(self.fail(pack, PipelineStage::Resolve, e)),
        };
        let mut staged = pack.manifest.clone();
        let outcome = staged
            .add_reference(reference)
            .map_err(|e| self.fail(pack, PipelineStage::Resolve, e))?;
        debug!("Registered {}: {:?}", spec, outcome);

        pack.state.transition(PackState::Resolving)?;
        let report = self
            .resolver
            .resolve_manifest(&mut staged, &self.cancel)
            .await
            .map_err(|e| self.fail(pack, PipelineStage::Resolve, e))?;
        debug!("Resolution report: {:?}", report);
        pack.manifest = staged;
        self.persist(pack)?;
        self.install_resolved(pack).await
    }

    /// Installs a pack directory that already carries a manifest, then
    /// points a launcher profile at it.
    #[instrument(skip(self))]
    pub async fn install_local(&self, dir: &Path) -> Result<(Pack, InstallReport)> {
        let mut pack = self.open(dir)?;
        let report = self.resolve_and_install(&mut pack).await?;
        self.create_launcher_profile(&mut pack)?;
        Ok((pack, report))
    }

    /// Downloads a pack archive, merges its manifest into `<packs>/<name>`
    /// (creating the pack if needed), applies its overrides and installs.
    #[instrument(skip(self))]
    pub async fn install_from_remote(&self, name: &str, url: &str) -> Result<(Pack, InstallReport)> {
        validate_pack_name(name).map_err(|e| self.fail_unopened(name, PipelineStage::FetchPack, e))?;
        let (remote, workdir) = self
            .fetch_remote_manifest(name, url)
            .await
            .map_err(|e| self.fail_unopened(name, PipelineStage::FetchPack, e))?;

        let root = self.config.pack_dir(name);
        let mut pack = if root.join(MANIFEST_FILENAME).is_file() {
            self.open(&root)?
        } else {
            let loader = remote.loader_version().unwrap_or_default().to_string();
            let mut fresh = Manifest::new(name, remote.platform_version(), &loader);
            fresh.version = remote.version.clone();
            fresh.author = remote.author.clone();
            Pack::create(&root, fresh)
                .map_err(|e| self.fail_unopened(name, PipelineStage::Create, e))?
        };

        let incoming = remote
            .files
            .iter()
            .cloned()
            .map(|mut reference| {
                reference.installed = false;
                reference
            })
            .collect();
        let summary = pack
            .manifest
            .merge_references(incoming)
            .map_err(|e| self.fail(&mut pack, PipelineStage::Resolve, e))?;
        debug!("Merged remote manifest: {:?}", summary);

        let overrides = workdir.path().join(&remote.overrides);
        if overrides.is_dir() {
            let root = pack.root().to_path_buf();
            self.installer
                .apply_overrides(&mut pack.manifest, &overrides, &root)
                .map_err(|e| self.fail(&mut pack, PipelineStage::Overrides, e))?;
        }
        self.persist(&mut pack)?;
        drop(workdir);

        let report = self.resolve_and_install(&mut pack).await?;
        self.create_launcher_profile(&mut pack)?;
        Ok((pack, report))
    }

    /// Fetches and unpacks the archive into a scratch directory that is
    /// removed when the returned guard drops.
    async fn fetch_remote_manifest(
        &self,
        name: &str,
        url: &str,
    ) -> Result<(Manifest, tempfile::TempDir)> {
        validate_url(url)?;
        let file_name = file_name_from_url(url).unwrap_or_else(|| format!("{name}.zip"));
        let descriptor = DownloadDescriptor::for_url(format!("pack {name}"), url, file_name);
        let archive = self.engine.fetch(&descriptor).await?;
        verify_content_type(&archive, PACK_ARCHIVE_TYPES)?;

        let tmp_root = self.engine.cache().tmp_dir();
        mcdex_aio::fs::create_dir_all(&tmp_root)?;
        let workdir = tempfile::Builder::new()
            .prefix("pack-")
            .tempdir_in(&tmp_root)?;
        let entries = extract_zip_async(&archive, workdir.path()).await?;
        debug!("Extracted {} entries from {}", entries, archive.display());

        let manifest_path = workdir.path().join(MANIFEST_FILENAME);
        if !manifest_path.is_file() {
            return Err(McdexError::NotFound(format!(
                "{url} does not contain {MANIFEST_FILENAME}"
            )));
        }
        let bytes = read_to_bytes_async(&manifest_path).await?;
        let manifest = Manifest::from_slice(&bytes, &manifest_path)?;
        Ok((manifest, workdir))
    }

    /// Brings the pack to Ready if needed, then sets up `<pack>/server`.
    #[instrument(skip_all, fields(pack = %pack.name()))]
    pub async fn provision_server(&self, pack: &mut Pack) -> Result<ServerReport> {
        if !matches!(pack.state, PackState::Ready) {
            self.resolve_and_install(pack).await?;
        }
        self.server
            .provision(pack, &self.cancel)
            .await
            .map_err(|e| self.fail(pack, PipelineStage::Server, e))
    }

    /// Hands the pack's versions and root to the launcher profile sink.
    pub fn create_launcher_profile(&self, pack: &mut Pack) -> Result<LauncherProfile> {
        let Some(forge) = pack.manifest.loader_version().map(str::to_string) else {
            let err = McdexError::Validation(format!("pack '{}' has no forge version", pack.name()));
            return Err(self.fail(pack, PipelineStage::LauncherProfile, err));
        };
        let profile = LauncherProfile {
            name: pack.name().to_string(),
            minecraft_version: pack.manifest.platform_version().to_string(),
            forge_version: forge,
            game_dir: pack.root().to_path_buf(),
        };
        self.launcher
            .write_profile(&profile)
            .map_err(|e| self.fail(pack, PipelineStage::LauncherProfile, e))?;
        Ok(profile)
    }
}
