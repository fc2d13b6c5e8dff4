// mcdex-common/src/cache.rs
// Layout of the shared artifact cache. Entries are written once and never
// mutated in place; nothing here evicts them.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::Result;
use crate::model::{CacheKey, DownloadDescriptor};
use crate::Config;

const TMP_DIR: &str = "tmp";

#[derive(Debug, Clone)]
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Create a new Cache using the config's cache_dir
    pub fn new(config: &Config) -> Result<Self> {
        Self::at(config.cache_dir())
    }

    pub fn at(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(cache_dir.join(TMP_DIR))?;
        Ok(Self { cache_dir })
    }

    pub fn get_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Staging area for in-progress downloads; same filesystem as the entries
    /// so a finished download can be renamed into place.
    pub fn tmp_dir(&self) -> PathBuf {
        self.cache_dir.join(TMP_DIR)
    }

    pub fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.relative_dir())
    }

    pub fn entry_path(&self, descriptor: &DownloadDescriptor) -> PathBuf {
        self.entry_dir(&descriptor.cache_key())
            .join(&descriptor.file_name)
    }

    /// Path of the cached artifact if one exists. Checksums are the caller's job.
    pub fn lookup(&self, descriptor: &DownloadDescriptor) -> Option<PathBuf> {
        let path = self.entry_path(descriptor);
        if path.is_file() {
            debug!("Cache hit for {} at {}", descriptor.label, path.display());
            Some(path)
        } else {
            None
        }
    }

    /// Drops an entry that failed verification so it can be fetched again.
    pub fn invalidate(&self, descriptor: &DownloadDescriptor) -> Result<()> {
        let path = self.entry_path(descriptor);
        if path.exists() {
            debug!("Removing invalid cache entry {}", path.display());
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_live_under_their_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(dir.path().join("cache")).unwrap();
        assert!(cache.tmp_dir().is_dir());

        let mut descriptor =
            DownloadDescriptor::for_url("jei", "https://cdn.example.com/jei.jar", "jei.jar");
        descriptor.project_id = Some(1);
        descriptor.file_id = Some(2);
        let expected = dir.path().join("cache/mods/1/2/jei.jar");
        assert_eq!(cache.entry_path(&descriptor), expected);
        assert!(cache.lookup(&descriptor).is_none());

        fs::create_dir_all(expected.parent().unwrap()).unwrap();
        fs::write(&expected, b"jar").unwrap();
        assert_eq!(cache.lookup(&descriptor), Some(expected.clone()));

        cache.invalidate(&descriptor).unwrap();
        assert!(!expected.exists());
    }
}
