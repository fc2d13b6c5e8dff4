// mcdex-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::UserDirs;
use tracing::debug;

use super::error::{McdexError, Result};

const DEFAULT_REPOSITORY_URL: &str = "https://api.mcdex.net/v1";
const DEFAULT_FORGE_MAVEN_URL: &str = "https://maven.minecraftforge.net";
const DEFAULT_JAVA: &str = "java";
const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);
const MAX_DEFAULT_WORKERS: usize = 6;
const LAUNCHER_PROFILES_FILENAME: &str = "launcher_profiles.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub mcdex_root: PathBuf,
    pub minecraft_dir: PathBuf,
    pub repository_url: String,
    pub forge_maven_url: String,
    pub java_command: String,
    pub max_workers: usize,
    pub download_attempts: u32,
    pub retry_backoff: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading mcdex configuration");

        let minecraft_dir = env::var("MCDEX_MINECRAFT_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".minecraft"));

        // The mcdex root lives under the launcher directory unless overridden.
        let mcdex_root = env::var("MCDEX_HOME")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                debug!("MCDEX_HOME not set or empty, falling back to <minecraft>/mcdex");
                minecraft_dir.join("mcdex")
            });
        debug!("Effective MCDEX_HOME set to: {}", mcdex_root.display());

        let repository_url = env::var("MCDEX_REPOSITORY_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REPOSITORY_URL.to_string());
        let forge_maven_url = env::var("MCDEX_FORGE_MAVEN_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_FORGE_MAVEN_URL.to_string());
        let java_command = env::var("MCDEX_JAVA")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_JAVA.to_string());

        let max_workers = match env::var("MCDEX_WORKERS") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|e| McdexError::Config(format!("MCDEX_WORKERS='{raw}': {e}")))?
                .max(1),
            Err(_) => default_worker_count(),
        };

        let download_attempts = match env::var("MCDEX_DOWNLOAD_ATTEMPTS") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|e| McdexError::Config(format!("MCDEX_DOWNLOAD_ATTEMPTS='{raw}': {e}")))?
                .max(1),
            Err(_) => DEFAULT_DOWNLOAD_ATTEMPTS,
        };

        let retry_backoff = match env::var("MCDEX_RETRY_BACKOFF") {
            Ok(raw) => humantime::parse_duration(&raw)
                .map_err(|e| McdexError::Config(format!("MCDEX_RETRY_BACKOFF='{raw}': {e}")))?,
            Err(_) => DEFAULT_RETRY_BACKOFF,
        };

        debug!("Configuration loaded successfully.");
        Ok(Self {
            mcdex_root,
            minecraft_dir,
            repository_url,
            forge_maven_url,
            java_command,
            max_workers,
            download_attempts,
            retry_backoff,
        })
    }

    /// Configuration rooted entirely under `root`, without consulting the environment.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            mcdex_root: root.join("mcdex"),
            minecraft_dir: root.clone(),
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            forge_maven_url: DEFAULT_FORGE_MAVEN_URL.to_string(),
            java_command: DEFAULT_JAVA.to_string(),
            max_workers: default_worker_count(),
            download_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn mcdex_root(&self) -> &Path {
        &self.mcdex_root
    }

    pub fn packs_dir(&self) -> PathBuf {
        self.mcdex_root.join("pack")
    }

    pub fn pack_dir(&self, pack_name: &str) -> PathBuf {
        self.packs_dir().join(pack_name)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.mcdex_root.join("cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.mcdex_root.join("logs")
    }

    pub fn launcher_profiles_path(&self) -> PathBuf {
        self.minecraft_dir.join(LAUNCHER_PROFILES_FILENAME)
    }

    pub fn forge_installer_url(&self, minecraft_version: &str, forge_version: &str) -> String {
        let coordinate = format!("{minecraft_version}-{forge_version}");
        format!(
            "{}/net/minecraftforge/forge/{coordinate}/forge-{coordinate}-installer.jar",
            self.forge_maven_url.trim_end_matches('/')
        )
    }
}

fn home_dir() -> PathBuf {
    UserDirs::new().map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf())
}

fn default_worker_count() -> usize {
    std::cmp::max(1, num_cpus::get_physical().saturating_sub(1)).min(MAX_DEFAULT_WORKERS)
}
