// mcdex-core/src/pack/store.rs
use std::io;
use std::path::Path;

use mcdex_aio::fs::atomic_write_file;
use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::Manifest;
use tracing::debug;

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    debug!("Loading manifest from {}", path.display());
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(McdexError::NotFound(format!(
                "manifest at {}",
                path.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };
    Manifest::from_slice(&bytes, path)
}

/// Writes the manifest with write-temp-then-rename so a reader never sees a
/// partially written document.
pub fn save_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    let bytes = manifest.to_vec_pretty()?;
    atomic_write_file(path, &bytes)?;
    debug!(
        "Saved manifest '{}' ({} references) to {}",
        manifest.name,
        manifest.files.len(),
        path.display()
    );
    Ok(())
}
