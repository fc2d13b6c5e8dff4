// mcdex-common/src/model/mod_ref.rs
use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::descriptor::DownloadDescriptor;
use crate::error::{McdexError, Result};

/// Where a reference's artifact comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Resolved through the mod repository by project/file identifier.
    #[default]
    Repository,
    /// A direct download URL; never expanded for dependencies.
    Explicit,
}

/// Identity used to enforce uniqueness inside a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceKey {
    Project(u64),
    Slug(String),
    Url(String),
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(id) => write!(f, "project {id}"),
            Self::Slug(slug) => write!(f, "slug '{slug}'"),
            Self::Url(url) => write!(f, "url {url}"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single entry in the manifest's `files` list.
///
/// `projectID`/`fileID`/`required` keep the CurseForge key spelling so exported
/// manifests stay readable by other launchers. Keys this build does not know
/// about are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModReference {
    #[serde(rename = "projectID", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(rename = "fileID", default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<u64>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Pulled in by another reference rather than requested by the user.
    #[serde(default, skip_serializing_if = "is_false")]
    pub dependency: bool,
    /// Project ids declared by the resolved file. `None` until resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub installed: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModReference {
    fn blank(source: SourceKind) -> Self {
        Self {
            project_id: None,
            file_id: None,
            required: true,
            source,
            name: String::new(),
            slug: None,
            url: None,
            filename: None,
            sha256: None,
            size: None,
            dependency: false,
            dependencies: None,
            installed: false,
            extra: Map::new(),
        }
    }

    pub fn explicit(url: impl Into<String>, name: impl Into<String>) -> Self {
        let url = url.into();
        let mut reference = Self::blank(SourceKind::Explicit);
        reference.filename = file_name_from_url(&url);
        reference.name = name.into();
        reference.url = Some(url);
        reference.dependencies = Some(Vec::new());
        reference
    }

    pub fn repository(project_id: u64, file_id: Option<u64>) -> Self {
        let mut reference = Self::blank(SourceKind::Repository);
        reference.project_id = Some(project_id);
        reference.file_id = file_id;
        reference
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        let slug = slug.into();
        let mut reference = Self::blank(SourceKind::Repository);
        reference.name = slug.clone();
        reference.slug = Some(slug);
        reference
    }

    pub fn as_dependency(mut self) -> Self {
        self.dependency = true;
        self
    }

    pub fn key(&self) -> ReferenceKey {
        match (self.source, self.project_id, &self.url, &self.slug) {
            (SourceKind::Explicit, _, Some(url), _) => ReferenceKey::Url(url.clone()),
            (_, Some(project_id), _, _) => ReferenceKey::Project(project_id),
            (_, None, _, Some(slug)) => ReferenceKey::Slug(slug.to_ascii_lowercase()),
            (_, None, Some(url), None) => ReferenceKey::Url(url.clone()),
            _ => ReferenceKey::Slug(self.name.to_ascii_lowercase()),
        }
    }

    pub fn is_explicit_source(&self) -> bool {
        self.source == SourceKind::Explicit
    }

    /// Resolved references carry everything needed to download without a lookup.
    pub fn is_resolved(&self) -> bool {
        let has_artifact = self.url.is_some() && self.filename.is_some();
        match self.source {
            SourceKind::Explicit => has_artifact,
            SourceKind::Repository => {
                has_artifact
                    && self.project_id.is_some()
                    && self.file_id.is_some()
                    && self.dependencies.is_some()
            }
        }
    }

    /// Both references point at the same concrete artifact.
    pub fn same_artifact(&self, other: &ModReference) -> bool {
        match (self.source, other.source) {
            (SourceKind::Explicit, SourceKind::Explicit) => self.url == other.url,
            (SourceKind::Repository, SourceKind::Repository) => {
                self.project_id == other.project_id && self.file_id == other.file_id
            }
            _ => false,
        }
    }

    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if let Some(slug) = &self.slug {
            return slug.clone();
        }
        match (self.project_id, &self.filename) {
            (_, Some(filename)) => filename.clone(),
            (Some(project_id), None) => format!("project-{project_id}"),
            (None, None) => self.url.clone().unwrap_or_else(|| "<unnamed>".to_string()),
        }
    }

    pub fn descriptor(&self) -> Option<DownloadDescriptor> {
        let url = self.url.clone()?;
        let file_name = self.filename.clone()?;
        Some(DownloadDescriptor {
            label: self.display_name(),
            url,
            file_name,
            sha256: self.sha256.clone(),
            size: self.size,
            project_id: self.project_id,
            file_id: self.file_id,
        })
    }
}

/// Accepts a bare file name: one normal path component, no separators.
pub fn validate_file_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || name.contains(['/', '\\']) || name.chars().any(char::is_control) {
        return Err(McdexError::InvalidReference(format!("unsafe file name '{name}'")));
    }
    Ok(())
}

/// Last path segment of a URL, percent-decoding left to the server.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(|segment| segment.to_string())
}

/// What the user asked for on the command line or in a pack archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModSpec {
    /// Direct download; name defaults to the URL's file stem.
    Url { url: String, name: Option<String> },
    /// Repository project by numeric id, optionally pinned to a file id.
    ProjectId { project_id: u64, file_id: Option<u64> },
    /// Repository project by slug, optionally pinned to a version.
    Slug { slug: String, version: Option<String> },
}

impl ModSpec {
    pub fn parse(input: &str, name: Option<&str>) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(McdexError::InvalidReference(input.to_string()));
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        if input.contains("://") {
            let url = Url::parse(input)
                .map_err(|e| McdexError::InvalidReference(format!("{input}: {e}")))?;
            if let Some((slug, file_id)) = curseforge_file_url(&url) {
                return Ok(Self::Slug {
                    slug,
                    version: Some(file_id.to_string()),
                });
            }
            if !matches!(url.scheme(), "http" | "https") {
                return Err(McdexError::InvalidReference(format!(
                    "{input}: unsupported scheme '{}'",
                    url.scheme()
                )));
            }
            return Ok(Self::Url {
                url: input.to_string(),
                name: name.map(str::to_string),
            });
        }

        if let Some((project, file)) = input.split_once(':') {
            let project_id = project
                .parse::<u64>()
                .map_err(|_| McdexError::InvalidReference(input.to_string()))?;
            let file_id = file
                .parse::<u64>()
                .map_err(|_| McdexError::InvalidReference(input.to_string()))?;
            return Ok(Self::ProjectId {
                project_id,
                file_id: Some(file_id),
            });
        }

        if let Ok(project_id) = input.parse::<u64>() {
            return Ok(Self::ProjectId {
                project_id,
                file_id: None,
            });
        }

        let (slug, version) = match input.split_once('@') {
            Some((slug, version)) if !version.is_empty() => (slug, Some(version.to_string())),
            Some((slug, _)) => (slug, None),
            None => (input, None),
        };
        if slug.is_empty()
            || !slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(McdexError::InvalidReference(input.to_string()));
        }
        Ok(Self::Slug {
            slug: slug.to_string(),
            version,
        })
    }
}

impl fmt::Display for ModSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url { url, .. } => write!(f, "{url}"),
            Self::ProjectId {
                project_id,
                file_id: Some(file_id),
            } => write!(f, "{project_id}:{file_id}"),
            Self::ProjectId { project_id, .. } => write!(f, "{project_id}"),
            Self::Slug {
                slug,
                version: Some(version),
            } => write!(f, "{slug}@{version}"),
            Self::Slug { slug, .. } => write!(f, "{slug}"),
        }
    }
}

/// Recognises `minecraft.curseforge.com/projects/<slug>/files/<id>` and
/// `www.curseforge.com/minecraft/mc-mods/<slug>/files/<id>`.
fn curseforge_file_url(url: &Url) -> Option<(String, u64)> {
    let host = url.host_str()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let (slug, file_id) = match (host, segments.as_slice()) {
        ("minecraft.curseforge.com", ["projects", slug, "files", id, ..]) => (*slug, *id),
        ("www.curseforge.com" | "curseforge.com", ["minecraft", "mc-mods", slug, "files", id, ..]) => {
            (*slug, *id)
        }
        _ => return None,
    };
    Some((slug.to_string(), file_id.parse().ok()?))
}
