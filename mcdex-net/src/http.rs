// mcdex-net/src/http.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::DownloadDescriptor;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::validation::validate_url;

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = concat!("mcdex/", env!("CARGO_PKG_VERSION"), " (Rust)");

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| McdexError::Config(format!("Failed to build HTTP client: {e}")))
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let jitter_cap = (self.backoff.as_millis() / 2) as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        base + Duration::from_millis(jitter)
    }
}

#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Downloads `descriptor` into `final_path`, staging in `tmp_dir`.
///
/// Only `Network` failures are retried. The staged file is removed on every
/// failure path, cancellation included, so `final_path` either holds a
/// verified artifact or is untouched.
pub async fn fetch_with_retry(
    client: &Client,
    descriptor: &DownloadDescriptor,
    tmp_dir: &Path,
    final_path: &Path,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<FetchedFile> {
    validate_url(&descriptor.url)?;
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(McdexError::Cancelled),
            r = download_and_verify(client, descriptor, tmp_dir, final_path) => r,
        };
        match result {
            Ok(fetched) => return Ok(fetched),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Download of {} failed (attempt {}/{}): {}; retrying in {:?}",
                    descriptor.label, attempt, attempts, e, delay
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(McdexError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => {
                error!("Download of {} failed: {}", descriptor.label, e);
                return Err(e);
            }
        }
    }
}

fn network_error(url: &str, message: impl ToString) -> McdexError {
    McdexError::Network {
        url: url.to_string(),
        message: message.to_string(),
    }
}

fn status_error(url: &str, status: StatusCode) -> McdexError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            McdexError::NotFound(format!("{url} ({status})"))
        }
        s if s.is_server_error()
            || s == StatusCode::TOO_MANY_REQUESTS
            || s == StatusCode::REQUEST_TIMEOUT =>
        {
            network_error(url, format!("server responded {s}"))
        }
        s => McdexError::Validation(format!("Server refused {url}: {s}")),
    }
}

async fn download_and_verify(
    client: &Client,
    descriptor: &DownloadDescriptor,
    tmp_dir: &Path,
    final_path: &Path,
) -> Result<FetchedFile> {
    let url = descriptor.url.as_str();
    debug!("Requesting {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| network_error(url, e))?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);
    if !status.is_success() {
        return Err(status_error(url, status));
    }

    tokio::fs::create_dir_all(tmp_dir).await?;
    let staged = NamedTempFile::new_in(tmp_dir)?;
    let mut writer = tokio::fs::File::from_std(staged.reopen()?);
    let mut hasher = Sha256::new();
    let mut size_bytes = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| network_error(url, e))?;
        hasher.update(&chunk);
        size_bytes += chunk.len() as u64;
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;
    writer.sync_all().await?;
    drop(writer);

    let actual = hex::encode(hasher.finalize());
    if let Some(expected) = &descriptor.sha256 {
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(McdexError::Integrity {
                target: descriptor.label.clone(),
                expected: expected.clone(),
                actual,
            });
        }
        debug!("Checksum verified for {}", descriptor.label);
    }
    if let Some(expected_size) = descriptor.size {
        if expected_size != size_bytes {
            return Err(McdexError::Integrity {
                target: descriptor.label.clone(),
                expected: format!("{expected_size} bytes"),
                actual: format!("{size_bytes} bytes"),
            });
        }
    }

    if let Some(parent) = final_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    staged.persist(final_path).map_err(|e| McdexError::from(e.error))?;
    debug!(
        "Moved verified file to final location: {}",
        final_path.display()
    );
    Ok(FetchedFile {
        path: final_path.to_path_buf(),
        size_bytes,
        sha256: actual,
    })
}
