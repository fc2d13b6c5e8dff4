// mcdex-core/src/launcher.rs
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use mcdex_aio::json_io::{read_json_sync, write_json_sync};
use mcdex_common::error::{McdexError, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

/// What the game launcher needs to start a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherProfile {
    pub name: String,
    pub minecraft_version: String,
    pub forge_version: String,
    pub game_dir: PathBuf,
}

impl LauncherProfile {
    /// Version id of the forge installation inside the launcher's
    /// `versions/` directory.
    pub fn version_id(&self) -> String {
        format!(
            "{mc}-forge{mc}-{forge}",
            mc = self.minecraft_version,
            forge = self.forge_version
        )
    }
}

pub trait LauncherProfileSink: Send + Sync {
    fn write_profile(&self, profile: &LauncherProfile) -> Result<()>;
}

/// Merges profiles into the launcher's `launcher_profiles.json`.
#[derive(Debug, Clone)]
pub struct LauncherProfilesFile {
    path: PathBuf,
}

impl LauncherProfilesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            debug!("{} does not exist yet, starting empty", self.path.display());
            return Ok(Map::new());
        }
        match read_json_sync::<Value>(&self.path)? {
            Value::Object(map) => Ok(map),
            _ => Err(McdexError::Validation(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl LauncherProfileSink for LauncherProfilesFile {
    #[instrument(skip_all, fields(profile = %profile.name))]
    fn write_profile(&self, profile: &LauncherProfile) -> Result<()> {
        let mut root = self.load()?;
        let profiles = root
            .entry("profiles")
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(profiles) = profiles else {
            return Err(McdexError::Validation(format!(
                "'profiles' in {} is not an object",
                self.path.display()
            )));
        };

        let entry = profiles
            .entry(profile.name.clone())
            .or_insert_with(|| {
                json!({ "created": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true) })
            });
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(fields) = entry {
            fields.insert("name".into(), Value::String(profile.name.clone()));
            fields.insert("type".into(), Value::String("custom".into()));
            fields.insert("lastVersionId".into(), Value::String(profile.version_id()));
            fields.insert(
                "gameDir".into(),
                Value::String(profile.game_dir.to_string_lossy().to_string()),
            );
        }

        write_json_sync(&self.path, &Value::Object(root))?;
        debug!(
            "Wrote launcher profile '{}' ({}) to {}",
            profile.name,
            profile.version_id(),
            self.path.display()
        );
        Ok(())
    }
}
