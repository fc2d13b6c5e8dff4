// mcdex-aio/src/extract.rs
// Pack archives are plain zips; extraction runs on the blocking pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mcdex_common::error::{McdexError, Result};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Extracts `archive_path` into `target_dir`. Entries whose names would
/// escape the target directory are refused.
pub async fn extract_zip_async(archive_path: &Path, target_dir: &Path) -> Result<usize> {
    let archive_path = archive_path.to_path_buf();
    let target_dir = target_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_zip_sync(&archive_path, &target_dir))
        .await
        .map_err(|e| McdexError::Extract(format!("JoinError in ZIP extraction: {e}")))?
}

pub fn extract_zip_sync(archive_path: &Path, target_dir: &Path) -> Result<usize> {
    debug!(
        "Extracting archive '{}' to '{}'",
        archive_path.display(),
        target_dir.display()
    );
    fs::create_dir_all(target_dir)?;
    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(io::BufReader::new(file)).map_err(|e| {
        McdexError::Extract(format!(
            "Failed to open ZIP {}: {e}",
            archive_path.display()
        ))
    })?;

    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative: PathBuf = entry.enclosed_name().ok_or_else(|| {
            McdexError::Extract(format!("Unsafe ZIP entry path '{}'", entry.name()))
        })?;
        let outpath = target_dir.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = fs::File::create(&outpath)?;
        io::copy(&mut entry, &mut outfile)?;
        extracted += 1;
    }
    if extracted == 0 {
        warn!("Archive {} contained no files", archive_path.display());
    }
    debug!("Extracted {} files", extracted);
    Ok(extracted)
}
