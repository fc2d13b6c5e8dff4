// mcdex-aio/src/fs.rs
// Filesystem primitives. Anything that replaces a file the user or the pack
// can observe goes through a temp file in the destination directory and a
// rename, so readers see either the old or the new content.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use mcdex_common::error::{McdexError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        McdexError::from(e)
    })
}

/// Removes a file, treating an already-missing file as success.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed file: {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            error!("Failed remove file {}: {}", path.display(), e);
            Err(McdexError::from(e))
        }
    }
}

fn parent_of(path: &Path) -> Result<&Path> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            McdexError::Generic(format!(
                "Cannot get parent directory for {}",
                path.display()
            ))
        })
}

fn persist(temp_file: NamedTempFile, target: &Path) -> Result<()> {
    let temp_path = temp_file.path().to_path_buf();
    temp_file.persist(target).map_err(|e| {
        error!(
            "Failed to persist temporary file {} over {}: {}",
            temp_path.display(),
            target.display(),
            e.error
        );
        McdexError::from(e.error)
    })?;
    Ok(())
}

/// Atomically writes data to a file using a temporary file.
pub fn atomic_write_file(target: &Path, content: &[u8]) -> Result<()> {
    let dir = parent_of(target)?;
    create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    debug!(
        "Atomically writing {} bytes to {} via {}",
        content.len(),
        target.display(),
        temp_file.path().display()
    );
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    persist(temp_file, target)
}

/// Copies `src` over `dst` through a temp file next to `dst`.
pub fn copy_file_atomic(src: &Path, dst: &Path) -> Result<u64> {
    let dir = parent_of(dst)?;
    create_dir_all(dir)?;

    let mut reader = fs::File::open(src).map_err(|e| {
        error!("Failed open file {}: {}", src.display(), e);
        McdexError::from(e)
    })?;
    let mut temp_file = NamedTempFile::new_in(dir)?;
    let copied = io::copy(&mut reader, &mut temp_file)?;
    temp_file.as_file().sync_all()?;
    persist(temp_file, dst)?;
    debug!(
        "Copied {} ({} bytes) to {}",
        src.display(),
        copied,
        dst.display()
    );
    Ok(copied)
}

/// Copies every regular file under `src` to the same relative path under
/// `dst`, overwriting what is there. Returns the relative paths written,
/// with `/` separators, in walk order.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<Vec<String>> {
    let mut written = Vec::new();
    if !src.is_dir() {
        debug!("No directory at {}, nothing to copy", src.display());
        return Ok(written);
    }
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            McdexError::Generic(format!("Failed to walk {}: {e}", src.display()))
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if !entry.file_type().is_file() {
            warn!("Skipping non-regular file {}", entry.path().display());
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| McdexError::Generic(format!("Path outside of {}: {e}", src.display())))?;
        copy_file_atomic(entry.path(), &dst.join(relative))?;
        written.push(to_slash(relative));
    }
    Ok(written)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub async fn read_to_bytes_async(path: &Path) -> Result<Vec<u8>> {
    debug!("Async reading file to bytes: {}", path.display());
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed read file {}: {}", path.display(), e);
        }
        McdexError::from(e)
    })
}
