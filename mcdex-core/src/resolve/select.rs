// mcdex-core/src/resolve/select.rs
use std::fmt;

use mcdex_common::error::{McdexError, Result};
use mcdex_net::{ProjectInfo, RemoteFile};
use semver::{Version, VersionReq};
use tracing::{debug, warn};

/// Platform and loader a pack targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub platform: String,
    pub loader: Option<String>,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Minecraft {} / forge {}",
            self.platform,
            self.loader.as_deref().unwrap_or("any")
        )
    }
}

/// A user-supplied version constraint on a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pin {
    FileId(u64),
    /// Matched against file id, display version or file name.
    Version(String),
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::FileId(id) => write!(f, "file {id}"),
            Pin::Version(v) => write!(f, "version {v}"),
        }
    }
}

impl Pin {
    fn matches(&self, file: &RemoteFile) -> bool {
        match self {
            Pin::FileId(id) => file.file_id == *id,
            Pin::Version(v) => {
                v.parse::<u64>().ok() == Some(file.file_id)
                    || file.display_version == *v
                    || file.file_name == *v
            }
        }
    }
}

/// Loader versions like forge's `14.23.5.2847` are not semver; those are
/// assumed compatible rather than rejected.
fn loader_compatible(requirement: &str, loader: &str, file: &RemoteFile) -> bool {
    let req = match VersionReq::parse(requirement) {
        Ok(req) => req,
        Err(e) => {
            warn!(
                "Ignoring unparseable loader requirement '{}' on {}: {}",
                requirement, file.file_name, e
            );
            return true;
        }
    };
    match Version::parse(loader) {
        Ok(version) => req.matches(&version),
        Err(_) => {
            warn!(
                "Loader version '{}' is not semver; assuming {} is compatible",
                loader, file.file_name
            );
            true
        }
    }
}

pub fn is_compatible(file: &RemoteFile, target: &Target) -> bool {
    if !file.game_versions.iter().any(|v| v == &target.platform) {
        return false;
    }
    match (&file.loader_versions, &target.loader) {
        (Some(requirement), Some(loader)) => loader_compatible(requirement, loader, file),
        _ => true,
    }
}

/// Picks the pinned file when a pin is given, else the newest compatible one.
pub fn select_file<'a>(
    project: &'a ProjectInfo,
    pin: Option<&Pin>,
    target: &Target,
) -> Result<&'a RemoteFile> {
    let no_match = || McdexError::NoCompatibleVersion {
        project: if project.slug.is_empty() {
            project.id.to_string()
        } else {
            project.slug.clone()
        },
        platform: target.platform.clone(),
        loader: target.loader.clone().unwrap_or_else(|| "any".to_string()),
    };

    if let Some(pin) = pin {
        let file = project
            .files
            .iter()
            .find(|f| pin.matches(f))
            .ok_or_else(no_match)?;
        if !is_compatible(file, target) {
            warn!(
                "{} of {} is pinned but does not declare support for {}",
                pin, project.slug, target
            );
        }
        return Ok(file);
    }

    let chosen = project
        .files
        .iter()
        .filter(|f| is_compatible(f, target))
        .max_by_key(|f| f.file_id)
        .ok_or_else(no_match)?;
    debug!(
        "Selected {} ({}) for {}",
        chosen.file_name, chosen.file_id, project.slug
    );
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(file_id: u64, games: &[&str], loader: Option<&str>) -> RemoteFile {
        RemoteFile {
            file_id,
            file_name: format!("mod-{file_id}.jar"),
            display_version: format!("1.{file_id}"),
            download_url: format!("https://cdn.example.com/mod-{file_id}.jar"),
            sha256: None,
            size: None,
            game_versions: games.iter().map(|s| s.to_string()).collect(),
            loader_versions: loader.map(str::to_string),
            dependencies: vec![],
        }
    }

    fn project(files: Vec<RemoteFile>) -> ProjectInfo {
        ProjectInfo {
            id: 1,
            slug: "mod".into(),
            name: "Mod".into(),
            files,
        }
    }

    fn target() -> Target {
        Target {
            platform: "1.16.5".into(),
            loader: Some("36.2.0".into()),
        }
    }

    #[test]
    fn newest_compatible_file_wins() {
        let p = project(vec![
            file(10, &["1.16.5"], None),
            file(30, &["1.17.1"], None),
            file(20, &["1.16.4", "1.16.5"], Some(">=36.0.0")),
            file(25, &["1.16.5"], Some(">=37.0.0")),
        ]);
        assert_eq!(select_file(&p, None, &target()).unwrap().file_id, 20);
    }

    #[test]
    fn pin_selects_exact_file() {
        let p = project(vec![file(10, &["1.16.5"], None), file(20, &["1.16.5"], None)]);
        let pinned = select_file(&p, Some(&Pin::Version("1.10".into())), &target()).unwrap();
        assert_eq!(pinned.file_id, 10);
        let pinned = select_file(&p, Some(&Pin::FileId(20)), &target()).unwrap();
        assert_eq!(pinned.file_id, 20);
        assert!(select_file(&p, Some(&Pin::FileId(99)), &target()).is_err());
    }

    #[test]
    fn nothing_compatible_is_an_error() {
        let p = project(vec![file(10, &["1.12.2"], None)]);
        let err = select_file(&p, None, &target()).unwrap_err();
        assert!(matches!(err, McdexError::NoCompatibleVersion { .. }));
    }

    #[test]
    fn non_semver_loader_is_lenient() {
        let old_forge = Target {
            platform: "1.12.2".into(),
            loader: Some("14.23.5.2847".into()),
        };
        let f = file(5, &["1.12.2"], Some(">=14.23.0"));
        assert!(is_compatible(&f, &old_forge));
    }
}
