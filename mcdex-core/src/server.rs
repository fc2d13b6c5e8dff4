// mcdex-core/src/server.rs
// Sets up a dedicated server next to a pack: forge installer plus the
// pack's installed mod set.

use std::path::{Path, PathBuf};

use mcdex_aio::fs::{copy_file_atomic, create_dir_all};
use mcdex_aio::process::{ensure_success, run_command_async};
use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::DownloadDescriptor;
use mcdex_common::Config;
use mcdex_net::{verify_content_type, DownloadEngine};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::pack::Pack;

const INSTALLER_CONTENT_TYPES: &[&str] = &["jar", "zip"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReport {
    pub server_dir: PathBuf,
    pub installer: PathBuf,
    pub mods_copied: usize,
}

pub struct ServerProvisioner {
    engine: DownloadEngine,
    java_command: String,
    config: Config,
}

impl ServerProvisioner {
    pub fn new(engine: DownloadEngine, config: &Config) -> Self {
        Self {
            engine,
            java_command: config.java_command.clone(),
            config: config.clone(),
        }
    }

    fn installer_descriptor(&self, minecraft: &str, forge: &str) -> DownloadDescriptor {
        let url = self.config.forge_installer_url(minecraft, forge);
        let file_name = format!("forge-{minecraft}-{forge}-installer.jar");
        DownloadDescriptor::for_url(format!("forge {minecraft}-{forge} installer"), url, file_name)
    }

    /// Downloads and validates the installer, runs it in `<pack>/server`,
    /// then copies every installed mod into `<pack>/server/mods`.
    #[instrument(skip_all, fields(pack = %pack.name()))]
    pub async fn provision(&self, pack: &Pack, cancel: &CancellationToken) -> Result<ServerReport> {
        let minecraft = pack.manifest.platform_version().to_string();
        let forge = pack
            .manifest
            .loader_version()
            .ok_or_else(|| {
                McdexError::Validation(format!("pack '{}' has no forge version", pack.name()))
            })?
            .to_string();

        let descriptor = self.installer_descriptor(&minecraft, &forge);
        let installer = self.engine.fetch(&descriptor).await?;
        verify_content_type(&installer, INSTALLER_CONTENT_TYPES)?;
        if cancel.is_cancelled() {
            return Err(McdexError::Cancelled);
        }

        let server_dir = pack.server_dir();
        create_dir_all(&server_dir)?;
        info!("Running forge installer for {}-{}", minecraft, forge);
        let output = run_command_async(
            self.java_command.clone(),
            vec![
                "-jar".to_string(),
                installer.to_string_lossy().to_string(),
                "--installServer".to_string(),
            ],
            Some(server_dir.clone()),
            None,
        )
        .await?;
        ensure_success("forge installer", &output)?;

        let mods_copied = copy_installed_mods(pack, &server_dir.join("mods"))?;
        debug!("Copied {} mods into {}", mods_copied, server_dir.display());
        Ok(ServerReport {
            server_dir,
            installer,
            mods_copied,
        })
    }
}

fn copy_installed_mods(pack: &Pack, target: &Path) -> Result<usize> {
    create_dir_all(target)?;
    let mods_dir = pack.mods_dir();
    let mut copied = 0;
    for reference in pack.manifest.files.iter().filter(|r| r.installed) {
        let Some(filename) = &reference.filename else {
            continue;
        };
        let source = mods_dir.join(filename);
        if !source.is_file() {
            return Err(McdexError::NotFound(format!(
                "{} is marked installed but {} is missing",
                reference.display_name(),
                source.display()
            )));
        }
        copy_file_atomic(&source, &target.join(filename))?;
        copied += 1;
    }
    Ok(copied)
}
