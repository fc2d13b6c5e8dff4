// mcdex-common/src/error.rs
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum McdexError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Semantic Versioning Error: {0}")]
    SemVer(#[from] Arc<semver::Error>),

    #[error("Archive Error: {0}")]
    Zip(#[from] Arc<zip::result::ZipError>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Corrupt manifest at {}: {reason}", .path.display())]
    CorruptManifest { path: PathBuf, reason: String },

    #[error("Unsupported manifest schema version {found} (this build understands up to {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("No version of '{project}' is compatible with Minecraft {platform} / loader {loader}")]
    NoCompatibleVersion {
        project: String,
        platform: String,
        loader: String,
    },

    #[error("Reference '{query}' is ambiguous; candidates: {}", .candidates.join(", "))]
    AmbiguousReference {
        query: String,
        candidates: Vec<String>,
    },

    #[error("Mod repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Integrity check failed for {target}: expected {expected}, got {actual}")]
    Integrity {
        target: String,
        expected: String,
        actual: String,
    },

    #[error("Out of disk space: {0}")]
    DiskSpace(String),

    #[error("Partial install: {} succeeded, {} failed ({})", .succeeded.len(), .failed.len(), describe_failures(.failed))]
    PartialInstall {
        succeeded: Vec<String>,
        failed: Vec<(String, String)>,
    },

    #[error("Duplicate mod reference: {0}")]
    Duplicate(String),

    #[error("Not a pack directory (no manifest found): {}", .0.display())]
    NotAPack(PathBuf),

    #[error("A pack named '{0}' already exists")]
    PackExists(String),

    #[error("Invalid mod reference '{0}'")]
    InvalidReference(String),

    #[error("Invalid pack state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Extraction Error: {0}")]
    Extract(String),

    #[error("Failed to execute command: {0}")]
    CommandExec(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

fn describe_failures(failed: &[(String, String)]) -> String {
    failed
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl McdexError {
    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, McdexError::Network { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            McdexError::Io(_) => "io",
            McdexError::Http(_) => "http",
            McdexError::Json(_) => "json",
            McdexError::SemVer(_) => "semver",
            McdexError::Zip(_) => "archive",
            McdexError::Config(_) => "config",
            McdexError::NotFound(_) => "not-found",
            McdexError::CorruptManifest { .. } => "corrupt-manifest",
            McdexError::UnsupportedSchema { .. } => "unsupported-schema",
            McdexError::NoCompatibleVersion { .. } => "no-compatible-version",
            McdexError::AmbiguousReference { .. } => "ambiguous-reference",
            McdexError::RepositoryUnavailable(_) => "repository-unavailable",
            McdexError::Network { .. } => "network",
            McdexError::Integrity { .. } => "integrity",
            McdexError::DiskSpace(_) => "disk-space",
            McdexError::PartialInstall { .. } => "partial-install",
            McdexError::Duplicate(_) => "duplicate",
            McdexError::NotAPack(_) => "not-a-pack",
            McdexError::PackExists(_) => "pack-exists",
            McdexError::InvalidReference(_) => "invalid-reference",
            McdexError::InvalidTransition { .. } => "invalid-transition",
            McdexError::Cancelled => "cancelled",
            McdexError::Extract(_) => "extract",
            McdexError::CommandExec(_) => "command",
            McdexError::Validation(_) => "validation",
            McdexError::Generic(_) => "generic",
        }
    }
}

impl From<std::io::Error> for McdexError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == io::ErrorKind::StorageFull {
            return McdexError::DiskSpace(err.to_string());
        }
        McdexError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for McdexError {
    fn from(err: reqwest::Error) -> Self {
        McdexError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for McdexError {
    fn from(err: serde_json::Error) -> Self {
        McdexError::Json(Arc::new(err))
    }
}

impl From<semver::Error> for McdexError {
    fn from(err: semver::Error) -> Self {
        McdexError::SemVer(Arc::new(err))
    }
}

impl From<zip::result::ZipError> for McdexError {
    fn from(err: zip::result::ZipError) -> Self {
        McdexError::Zip(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, McdexError>;
