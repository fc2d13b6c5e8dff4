// mcdex-core/src/pack/mod.rs
pub mod controller;
pub mod store;

use std::path::{Path, PathBuf};

use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::{Manifest, PackState, MANIFEST_FILENAME};
use tracing::debug;

pub use controller::PackController;

const MODS_DIR: &str = "mods";
const SERVER_DIR: &str = "server";

/// Handle on a pack directory whose manifest has been validated.
#[derive(Debug)]
pub struct Pack {
    root: PathBuf,
    pub manifest: Manifest,
    pub state: PackState,
}

impl Pack {
    /// Writes a fresh manifest into `root`. Refuses to overwrite an existing pack.
    pub fn create(root: &Path, manifest: Manifest) -> Result<Self> {
        let mut state = PackState::default();
        let manifest_path = root.join(MANIFEST_FILENAME);
        if manifest_path.exists() {
            return Err(McdexError::PackExists(manifest.name.clone()));
        }
        state.transition(PackState::Created)?;
        mcdex_aio::fs::create_dir_all(&root.join(MODS_DIR))?;
        store::save_manifest(&manifest, &manifest_path)?;
        state.transition(PackState::ManifestLoaded)?;
        debug!("Created pack '{}' at {}", manifest.name, root.display());
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            state,
        })
    }

    /// Opens an existing pack. The directory is made absolute first, so a
    /// pack opened as `.` keeps its identity if the working directory changes.
    pub fn open(dir: &Path) -> Result<Self> {
        let root = std::path::absolute(dir)?;
        let manifest_path = root.join(MANIFEST_FILENAME);
        if !manifest_path.is_file() {
            return Err(McdexError::NotAPack(root));
        }
        let manifest = store::load_manifest(&manifest_path)?;
        let mut state = PackState::default();
        state.transition(PackState::ManifestLoaded)?;
        Ok(Self {
            root,
            manifest,
            state,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.root.join(MODS_DIR)
    }

    pub fn server_dir(&self) -> PathBuf {
        self.root.join(SERVER_DIR)
    }

    pub fn save(&self) -> Result<()> {
        store::save_manifest(&self.manifest, &self.manifest_path())
    }
}
