#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use mcdex_common::{Config, McdexError, Result};
use mcdex_core::{LauncherProfilesFile, PackController};
use mcdex_net::{ModRepository, ProjectInfo, ProjectSummary, RemoteFile};
use tiny_http::{Response, Server};
use tokio_util::sync::CancellationToken;

pub const MC: &str = "1.16.5";
pub const FORGE: &str = "36.2.0";

/// Serves a fixed set of paths and counts every request. Paths listed in
/// `failing` answer 404 until removed.
pub struct ArtifactServer {
    pub base: String,
    hits: Arc<AtomicUsize>,
    failing: Arc<Mutex<Vec<String>>>,
    server: Arc<Server>,
}

impl ArtifactServer {
    pub fn start(files: HashMap<String, Vec<u8>>) -> ArtifactServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let server = Arc::new(Server::from_listener(listener, None).expect("start test server"));
        let hits = Arc::new(AtomicUsize::new(0));
        let failing: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let loop_server = Arc::clone(&server);
        let loop_hits = Arc::clone(&hits);
        let loop_failing = Arc::clone(&failing);
        thread::spawn(move || {
            for request in loop_server.incoming_requests() {
                loop_hits.fetch_add(1, Ordering::SeqCst);
                let path = request.url().to_string();
                let broken = loop_failing.lock().unwrap().contains(&path);
                let response = match files.get(&path) {
                    Some(body) if !broken => Response::from_data(body.clone()),
                    _ => Response::from_data(b"not found".to_vec()).with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        ArtifactServer {
            base: format!("http://{addr}"),
            hits,
            failing,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn break_path(&self, path: &str) {
        self.failing.lock().unwrap().push(path.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }
}

impl Drop for ArtifactServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// In-memory repository that counts every search and project lookup.
#[derive(Default)]
pub struct FakeRepository {
    projects: Mutex<BTreeMap<u64, ProjectInfo>>,
    lookups: AtomicUsize,
}

impl FakeRepository {
    pub fn add_project(&self, id: u64, slug: &str, name: &str, files: Vec<RemoteFile>) {
        self.projects.lock().unwrap().insert(
            id,
            ProjectInfo {
                id,
                slug: slug.to_string(),
                name: name.to_string(),
                files,
            },
        );
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModRepository for FakeRepository {
    async fn search(&self, slug: &str) -> Result<Vec<ProjectSummary>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let needle = slug.to_ascii_lowercase();
        Ok(self
            .projects
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.slug.contains(&needle))
            .map(|p| ProjectSummary {
                id: p.id,
                slug: p.slug.clone(),
                name: p.name.clone(),
            })
            .collect())
    }

    async fn project(&self, project_id: u64) -> Result<ProjectInfo> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.projects
            .lock()
            .unwrap()
            .get(&project_id)
            .cloned()
            .ok_or_else(|| McdexError::NotFound(format!("project {project_id}")))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

pub fn jar_body(name: &str) -> Vec<u8> {
    format!("PK\x03\x04 jar contents of {name}").into_bytes()
}

/// A repository file served from `/<file_name>` on `server_base`.
pub fn remote_file(server_base: &str, file_id: u64, file_name: &str, deps: &[u64]) -> RemoteFile {
    RemoteFile {
        file_id,
        file_name: file_name.to_string(),
        display_version: format!("{file_id}"),
        download_url: format!("{server_base}/{file_name}"),
        sha256: Some(sha256_hex(&jar_body(file_name))),
        size: Some(jar_body(file_name).len() as u64),
        game_versions: vec![MC.to_string()],
        loader_versions: None,
        dependencies: deps.to_vec(),
    }
}

/// Paths for `file_names`, each serving `jar_body(name)`.
pub fn jar_files(file_names: &[&str]) -> HashMap<String, Vec<u8>> {
    file_names
        .iter()
        .map(|name| (format!("/{name}"), jar_body(name)))
        .collect()
}

pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, body) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn test_config(root: &Path) -> Config {
    let mut config = Config::with_root(root);
    config.max_workers = 2;
    config.download_attempts = 2;
    config.retry_backoff = Duration::from_millis(1);
    config
}

pub fn controller(config: Config, repository: Arc<FakeRepository>) -> PackController {
    controller_with_cancel(config, repository, CancellationToken::new())
}

pub fn controller_with_cancel(
    config: Config,
    repository: Arc<FakeRepository>,
    cancel: CancellationToken,
) -> PackController {
    let launcher = Arc::new(LauncherProfilesFile::new(config.launcher_profiles_path()));
    PackController::new(config, repository, launcher, cancel).expect("controller")
}
