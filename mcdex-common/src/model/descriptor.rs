// mcdex-common/src/model/descriptor.rs
use std::fmt;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

/// Everything the download engine needs to materialize one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    /// Human readable name for logs and events.
    pub label: String,
    pub url: String,
    pub file_name: String,
    pub sha256: Option<String>,
    pub size: Option<u64>,
    pub project_id: Option<u64>,
    pub file_id: Option<u64>,
}

impl DownloadDescriptor {
    pub fn for_url(label: impl Into<String>, url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            file_name: file_name.into(),
            sha256: None,
            size: None,
            project_id: None,
            file_id: None,
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        match (self.project_id, self.file_id) {
            (Some(project_id), Some(file_id)) => CacheKey::Artifact {
                project_id,
                file_id,
            },
            _ => CacheKey::for_url(&self.url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Artifact { project_id: u64, file_id: u64 },
    /// First 16 hex chars of the URL's SHA-256.
    UrlHash(String),
}

impl CacheKey {
    pub fn for_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        let mut encoded = hex::encode(digest);
        encoded.truncate(16);
        CacheKey::UrlHash(encoded)
    }

    /// Relative directory of this key under the cache root.
    pub fn relative_dir(&self) -> PathBuf {
        match self {
            CacheKey::Artifact {
                project_id,
                file_id,
            } => PathBuf::from("mods")
                .join(project_id.to_string())
                .join(file_id.to_string()),
            CacheKey::UrlHash(hash) => PathBuf::from("url").join(hash),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Artifact {
                project_id,
                file_id,
            } => write!(f, "{project_id}/{file_id}"),
            CacheKey::UrlHash(hash) => write!(f, "url:{hash}"),
        }
    }
}
