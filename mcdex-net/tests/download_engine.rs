mod common;

use std::fs;
use std::thread;
use std::time::Duration;

use common::{sha256_hex, TestServer};
use mcdex_common::model::DownloadDescriptor;
use mcdex_common::{Config, McdexError};
use mcdex_net::DownloadEngine;
use tokio_util::sync::CancellationToken;

const JAR: &[u8] = b"PK\x03\x04 pretend this is a mod jar";

fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::with_root(root);
    config.download_attempts = 3;
    config.retry_backoff = Duration::from_millis(1);
    config
}

fn descriptor(url: String, sha256: Option<String>) -> DownloadDescriptor {
    let mut descriptor = DownloadDescriptor::for_url("jei", url, "jei.jar");
    descriptor.project_id = Some(238222);
    descriptor.file_id = Some(3043174);
    descriptor.sha256 = sha256;
    descriptor
}

fn tmp_is_empty(engine: &DownloadEngine) -> bool {
    fs::read_dir(engine.cache().tmp_dir())
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_download() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| {
        thread::sleep(Duration::from_millis(200));
        (200, JAR.to_vec())
    });
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let wanted = descriptor(server.url("/jei.jar"), Some(sha256_hex(JAR)));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let wanted = wanted.clone();
        tasks.push(tokio::spawn(async move { engine.fetch(&wanted).await }));
    }
    let mut paths = Vec::new();
    for task in tasks {
        paths.push(task.await.expect("task panicked")?);
    }

    assert_eq!(server.hits(), 1);
    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(fs::read(&paths[0])?, JAR);
    assert!(paths[0].ends_with("mods/238222/3043174/jei.jar"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_failure() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| {
        thread::sleep(Duration::from_millis(200));
        (404, Vec::new())
    });
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let wanted = descriptor(server.url("/gone.jar"), None);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let wanted = wanted.clone();
        tasks.push(tokio::spawn(async move { engine.fetch(&wanted).await }));
    }
    let mut errors = Vec::new();
    for task in tasks {
        errors.push(task.await.expect("task panicked").unwrap_err());
    }

    assert_eq!(server.hits(), 1);
    assert!(errors.iter().all(|e| matches!(e, McdexError::NotFound(_))), "{errors:?}");
    assert!(errors.windows(2).all(|w| w[0].to_string() == w[1].to_string()));
    assert!(engine.cache().lookup(&wanted).is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_callers_reuse_a_download_that_just_finished() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (200, JAR.to_vec()));
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let wanted = descriptor(server.url("/jei.jar"), Some(sha256_hex(JAR)));

    let mut tasks = Vec::new();
    for i in 0..32 {
        let engine = engine.clone();
        let wanted = wanted.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..(i % 8) {
                tokio::task::yield_now().await;
            }
            engine.fetch(&wanted).await
        }));
    }
    for task in tasks {
        assert_eq!(fs::read(task.await.expect("task panicked")?)?, JAR);
    }
    assert_eq!(server.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn cached_artifact_needs_no_network() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (200, JAR.to_vec()));
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let wanted = descriptor(server.url("/jei.jar"), Some(sha256_hex(JAR)));

    let first = engine.fetch(&wanted).await?;
    let second = engine.fetch(&wanted).await?;
    assert_eq!(first, second);
    assert_eq!(server.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn corrupted_cache_entry_is_replaced() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (200, JAR.to_vec()));
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let wanted = descriptor(server.url("/jei.jar"), Some(sha256_hex(JAR)));

    let path = engine.fetch(&wanted).await?;
    fs::write(&path, b"bit rot")?;
    let again = engine.fetch(&wanted).await?;
    assert_eq!(fs::read(again)?, JAR);
    assert_eq!(server.hits(), 2);
    Ok(())
}

#[tokio::test]
async fn checksum_mismatch_is_fatal_and_leaves_nothing_behind() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (200, b"tampered".to_vec()));
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let wanted = descriptor(server.url("/jei.jar"), Some(sha256_hex(JAR)));

    let err = engine.fetch(&wanted).await.unwrap_err();
    assert!(matches!(err, McdexError::Integrity { .. }), "got {err:?}");
    assert_eq!(server.hits(), 1, "integrity failures are not retried");
    assert!(engine.cache().lookup(&wanted).is_none());
    assert!(tmp_is_empty(&engine));
    Ok(())
}

#[tokio::test]
async fn transient_failures_are_retried() -> Result<(), McdexError> {
    let server = TestServer::start(|_, seen| {
        if seen < 2 {
            (503, b"busy".to_vec())
        } else {
            (200, JAR.to_vec())
        }
    });
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let path = engine.fetch(&descriptor(server.url("/jei.jar"), None)).await?;
    assert_eq!(fs::read(path)?, JAR);
    assert_eq!(server.hits(), 3);
    Ok(())
}

#[tokio::test]
async fn retries_are_bounded() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (500, b"down".to_vec()));
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let err = engine
        .fetch(&descriptor(server.url("/jei.jar"), None))
        .await
        .unwrap_err();
    assert!(matches!(err, McdexError::Network { .. }));
    assert_eq!(server.hits(), 3);
    Ok(())
}

#[tokio::test]
async fn missing_artifact_is_not_retried() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (404, Vec::new()));
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let err = engine
        .fetch(&descriptor(server.url("/gone.jar"), None))
        .await
        .unwrap_err();
    assert!(matches!(err, McdexError::NotFound(_)));
    assert_eq!(server.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn cancelled_engine_does_not_download() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (200, JAR.to_vec()));
    let temp = tempfile::tempdir()?;
    let cancel = CancellationToken::new();
    let engine = DownloadEngine::new(&test_config(temp.path()), cancel.clone())?;
    cancel.cancel();
    let err = engine
        .fetch(&descriptor(server.url("/jei.jar"), None))
        .await
        .unwrap_err();
    assert!(matches!(err, McdexError::Cancelled));
    assert_eq!(server.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn url_only_artifacts_are_keyed_by_url() -> Result<(), McdexError> {
    let server = TestServer::start(|_, _| (200, JAR.to_vec()));
    let temp = tempfile::tempdir()?;
    let engine = DownloadEngine::new(&test_config(temp.path()), CancellationToken::new())?;
    let wanted = DownloadDescriptor::for_url("mod", server.url("/files/mod.jar"), "mod.jar");
    let path = engine.fetch(&wanted).await?;
    assert!(path.starts_with(engine.cache().get_dir().join("url")));
    assert!(path.ends_with("mod.jar"));
    Ok(())
}
