// mcdex-common/src/model/manifest.rs
use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::mod_ref::{validate_file_name, ModReference, ReferenceKey};
use crate::error::{McdexError, Result};

pub const MANIFEST_FILENAME: &str = "manifest.json";
pub const MANIFEST_TYPE: &str = "minecraftModpack";
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;
const DEFAULT_OVERRIDES_DIR: &str = "overrides";
const FORGE_LOADER_PREFIX: &str = "forge-";

fn default_manifest_type() -> String {
    MANIFEST_TYPE.to_string()
}

fn default_overrides() -> String {
    DEFAULT_OVERRIDES_DIR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModLoader {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftSection {
    pub version: String,
    #[serde(default)]
    pub mod_loaders: Vec<ModLoader>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The persisted description of a pack (`manifest.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default = "default_manifest_type")]
    pub manifest_type: String,
    pub manifest_version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub minecraft: MinecraftSection,
    #[serde(default)]
    pub files: Vec<ModReference>,
    #[serde(default = "default_overrides")]
    pub overrides: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub override_files: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub installed_files: BTreeSet<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What `add_reference` did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Replaced an older file of the same project at the same position.
    Upgraded,
    /// An existing dependency entry became an explicit request.
    Promoted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub upgraded: usize,
    pub unchanged: usize,
}

impl Manifest {
    pub fn new(name: &str, minecraft_version: &str, forge_version: &str) -> Self {
        Self {
            manifest_type: default_manifest_type(),
            manifest_version: SUPPORTED_SCHEMA_VERSION,
            name: name.to_string(),
            version: "1.0.0".to_string(),
            author: String::new(),
            created: Some(Utc::now()),
            minecraft: MinecraftSection {
                version: minecraft_version.to_string(),
                mod_loaders: vec![ModLoader {
                    id: format!("{FORGE_LOADER_PREFIX}{forge_version}"),
                    primary: true,
                    extra: Map::new(),
                }],
                extra: Map::new(),
            },
            files: Vec::new(),
            overrides: default_overrides(),
            override_files: BTreeSet::new(),
            installed_files: BTreeSet::new(),
            extra: Map::new(),
        }
    }

    /// Parses a manifest, refusing schema versions from the future before
    /// looking at anything else.
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        let corrupt = |reason: String| McdexError::CorruptManifest {
            path: path.to_path_buf(),
            reason,
        };
        let raw: Value = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        let version = raw
            .get("manifestVersion")
            .and_then(Value::as_u64)
            .ok_or_else(|| corrupt("missing or non-numeric manifestVersion".to_string()))?;
        let version = u32::try_from(version).unwrap_or(u32::MAX);
        if version > SUPPORTED_SCHEMA_VERSION {
            return Err(McdexError::UnsupportedSchema {
                found: version,
                supported: SUPPORTED_SCHEMA_VERSION,
            });
        }
        let manifest: Manifest = serde_json::from_value(raw).map_err(|e| corrupt(e.to_string()))?;
        manifest.check_paths()?;
        debug!(
            "Parsed manifest '{}' with {} references",
            manifest.name,
            manifest.files.len()
        );
        Ok(manifest)
    }

    /// Every name the installer joins onto a directory must be a single
    /// plain component.
    pub fn check_paths(&self) -> Result<()> {
        let file_names = self.files.iter().filter_map(|r| r.filename.as_deref());
        for name in file_names.chain(self.installed_files.iter().map(String::as_str)) {
            validate_file_name(name)?;
        }
        validate_file_name(&self.overrides)
    }

    pub fn to_vec_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn platform_version(&self) -> &str {
        &self.minecraft.version
    }

    fn primary_loader(&self) -> Option<&ModLoader> {
        self.minecraft
            .mod_loaders
            .iter()
            .find(|l| l.primary)
            .or_else(|| self.minecraft.mod_loaders.first())
    }

    /// Version part of the primary loader id (`forge-36.2.0` -> `36.2.0`).
    pub fn loader_version(&self) -> Option<&str> {
        self.primary_loader().map(|loader| {
            loader
                .id
                .strip_prefix(FORGE_LOADER_PREFIX)
                .unwrap_or(loader.id.as_str())
        })
    }

    pub fn position(&self, key: &ReferenceKey) -> Option<usize> {
        self.files.iter().position(|r| &r.key() == key)
    }

    pub fn get(&self, key: &ReferenceKey) -> Option<&ModReference> {
        self.position(key).map(|i| &self.files[i])
    }

    /// Adds a reference while keeping keys unique.
    pub fn add_reference(&mut self, reference: ModReference) -> Result<AddOutcome> {
        let key = reference.key();
        let Some(index) = self.position(&key) else {
            self.files.push(reference);
            return Ok(AddOutcome::Added);
        };

        let existing = &self.files[index];
        if existing.same_artifact(&reference) {
            // An explicit request always wins over a dependency-derived entry.
            if existing.dependency && !reference.dependency {
                self.files[index].dependency = false;
                return Ok(AddOutcome::Promoted);
            }
            return Err(McdexError::Duplicate(format!(
                "{} ({key}) is already in the manifest",
                existing.display_name()
            )));
        }

        let is_upgrade = match (existing.file_id, reference.file_id) {
            (Some(old), Some(new)) => new > old,
            (None, Some(_)) => true,
            _ => false,
        };
        if !is_upgrade {
            return Err(McdexError::Duplicate(format!(
                "{} ({key}) is already in the manifest with a different, newer or equal version",
                existing.display_name()
            )));
        }
        let keep_explicit = !existing.dependency;
        let mut upgraded = reference;
        upgraded.dependency = upgraded.dependency && !keep_explicit;
        self.upgrade_reference(upgraded)?;
        Ok(AddOutcome::Upgraded)
    }

    /// Replaces the entry with the same key in place, keeping its position.
    pub fn upgrade_reference(&mut self, reference: ModReference) -> Result<()> {
        let key = reference.key();
        let index = self
            .position(&key)
            .ok_or_else(|| McdexError::NotFound(format!("{key} is not in the manifest")))?;
        debug!(
            "Upgrading {} in place at position {}",
            reference.display_name(),
            index
        );
        self.files[index] = reference;
        Ok(())
    }

    /// All-or-nothing batch add: on the first error nothing is applied.
    pub fn add_references(&mut self, references: Vec<ModReference>) -> Result<Vec<AddOutcome>> {
        let staged = self.files.clone();
        let mut outcomes = Vec::with_capacity(references.len());
        for reference in references {
            match self.add_reference(reference) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    self.files = staged;
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }

    /// Like `add_references`, but identical entries are not an error.
    pub fn merge_references(&mut self, references: Vec<ModReference>) -> Result<MergeSummary> {
        let original = self.files.clone();
        let mut summary = MergeSummary::default();
        for reference in references {
            if let Some(existing) = self.get(&reference.key()) {
                if existing.same_artifact(&reference) && existing.dependency == reference.dependency {
                    summary.unchanged += 1;
                    continue;
                }
            }
            match self.add_reference(reference) {
                Ok(AddOutcome::Added) => summary.added += 1,
                Ok(AddOutcome::Upgraded) | Ok(AddOutcome::Promoted) => summary.upgraded += 1,
                // An older file than the one we already track: keep ours.
                Err(McdexError::Duplicate(msg)) => {
                    debug!("Keeping existing entry during merge: {}", msg);
                    summary.unchanged += 1;
                }
                Err(e) => {
                    self.files = original;
                    return Err(e);
                }
            }
        }
        Ok(summary)
    }

    pub fn remove_reference(&mut self, key: &ReferenceKey) -> Option<ModReference> {
        self.position(key).map(|index| self.files.remove(index))
    }
}
