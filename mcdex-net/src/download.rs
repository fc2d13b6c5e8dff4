// mcdex-net/src/download.rs
// Download & cache engine. One network download per cache key at a time;
// concurrent callers for the same key share the in-flight result.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, StreamExt};
use mcdex_common::cache::Cache;
use mcdex_common::config::Config;
use mcdex_common::error::{McdexError, Result};
use mcdex_common::model::{CacheKey, DownloadDescriptor};
use mcdex_common::pipeline::PipelineEvent;
use reqwest::Client;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::http::{build_http_client, fetch_with_retry, RetryPolicy};
use crate::validation::verify_checksum;

type SharedDownload = Shared<BoxFuture<'static, Result<PathBuf>>>;

struct EngineInner {
    client: Client,
    cache: Cache,
    policy: RetryPolicy,
    cancel: CancellationToken,
    events: Option<broadcast::Sender<PipelineEvent>>,
    in_flight: Mutex<HashMap<CacheKey, SharedDownload>>,
}

impl EngineInner {
    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // No subscribers is fine.
            let _ = tx.send(event);
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, SharedDownload>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn download(&self, descriptor: &DownloadDescriptor) -> Result<PathBuf> {
        self.emit(PipelineEvent::DownloadStarted {
            name: descriptor.label.clone(),
            url: descriptor.url.clone(),
        });
        let final_path = self.cache.entry_path(descriptor);
        match fetch_with_retry(
            &self.client,
            descriptor,
            &self.cache.tmp_dir(),
            &final_path,
            self.policy,
            &self.cancel,
        )
        .await
        {
            Ok(fetched) => {
                self.emit(PipelineEvent::DownloadFinished {
                    name: descriptor.label.clone(),
                    path: fetched.path.clone(),
                    size_bytes: fetched.size_bytes,
                });
                Ok(fetched.path)
            }
            Err(e) => {
                self.emit(PipelineEvent::download_failed(
                    descriptor.label.clone(),
                    descriptor.url.clone(),
                    &e,
                ));
                Err(e)
            }
        }
    }
}

/// Cheap to clone; clones share the cache, client and in-flight table.
#[derive(Clone)]
pub struct DownloadEngine {
    inner: Arc<EngineInner>,
}

impl DownloadEngine {
    pub fn new(config: &Config, cancel: CancellationToken) -> Result<Self> {
        Self::with_cache(Cache::new(config)?, config, cancel)
    }

    pub fn with_cache(cache: Cache, config: &Config, cancel: CancellationToken) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(EngineInner {
                client: build_http_client()?,
                cache,
                policy: RetryPolicy {
                    attempts: config.download_attempts,
                    backoff: config.retry_backoff,
                },
                cancel,
                events: None,
                in_flight: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Must be called before the engine is cloned.
    pub fn with_events(mut self, events: broadcast::Sender<PipelineEvent>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.events = Some(events),
            None => warn!("Download engine already shared; events not attached"),
        }
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    /// Cached artifact path if present and, when a checksum is known, valid.
    /// Invalid entries are dropped so the next fetch replaces them.
    pub async fn cached(&self, descriptor: &DownloadDescriptor) -> Result<Option<PathBuf>> {
        let Some(path) = self.inner.cache.lookup(descriptor) else {
            return Ok(None);
        };
        let Some(expected) = descriptor.sha256.clone() else {
            return Ok(Some(path));
        };
        let check_path = path.clone();
        let verified = tokio::task::spawn_blocking(move || verify_checksum(&check_path, &expected))
            .await
            .map_err(|e| McdexError::Generic(format!("JoinError verifying cache entry: {e}")))?;
        match verified {
            Ok(()) => Ok(Some(path)),
            Err(McdexError::Integrity { actual, .. }) => {
                warn!(
                    "Cached {} has checksum {}, discarding",
                    descriptor.label, actual
                );
                self.inner.cache.invalidate(descriptor)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns a local path to the artifact, downloading it at most once per
    /// cache key no matter how many callers ask concurrently.
    #[instrument(skip(self, descriptor), fields(name = %descriptor.label))]
    pub async fn fetch(&self, descriptor: &DownloadDescriptor) -> Result<PathBuf> {
        if self.inner.cancel.is_cancelled() {
            return Err(McdexError::Cancelled);
        }
        if let Some(path) = self.cached(descriptor).await? {
            self.inner.emit(PipelineEvent::DownloadCached {
                name: descriptor.label.clone(),
                path: path.clone(),
            });
            return Ok(path);
        }

        let key = descriptor.cache_key();
        let shared = {
            let mut in_flight = self.inner.in_flight();
            if let Some(existing) = in_flight.get(&key) {
                debug!("Joining in-flight download for {}", key);
                existing.clone()
            } else if let Some(path) = self.inner.cache.lookup(descriptor) {
                // A download for this key finished after the check above.
                debug!("{} landed in the cache while waiting", key);
                self.inner.emit(PipelineEvent::DownloadCached {
                    name: descriptor.label.clone(),
                    path: path.clone(),
                });
                return Ok(path);
            } else {
                let shared = self.spawn_download(key.clone(), descriptor.clone());
                in_flight.insert(key, shared.clone());
                shared
            }
        };
        shared.await
    }

    // Called with the in-flight lock held, so the task's own removal of its
    // entry always happens after the insert.
    fn spawn_download(&self, key: CacheKey, descriptor: DownloadDescriptor) -> SharedDownload {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = inner.download(&descriptor).await;
            inner.in_flight().remove(&key);
            result
        });
        async move {
            handle
                .await
                .map_err(|e| McdexError::Generic(format!("Download task failed: {e}")))?
        }
        .boxed()
        .shared()
    }

    /// Fetches many artifacts with at most `concurrency` in flight. Results
    /// come back in input order.
    pub async fn fetch_all(
        &self,
        descriptors: Vec<DownloadDescriptor>,
        concurrency: usize,
    ) -> Vec<(DownloadDescriptor, Result<PathBuf>)> {
        stream::iter(descriptors)
            .map(|descriptor| async move {
                let result = self.fetch(&descriptor).await;
                (descriptor, result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
