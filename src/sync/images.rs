//! Vehicle image download and storage
//!
//! Downloads fan out under a process-wide semaphore so a burst of vehicles
//! cannot open more than the configured number of connections. Per-URL
//! failures are logged and skipped; they never fail the surrounding stock
//! sync.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use md5::{Digest, Md5};
use metrics::counter;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::ImageSyncConfig;

/// Fetches image bytes from a URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// Persists image bytes and returns the hosted URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, vehicle_id: &Uuid, hash_hex: &str, bytes: &[u8])
    -> anyhow::Result<String>;
}

/// HTTP image source backed by a shared reqwest client.
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(timeout_ms: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Stores images on the local filesystem under a per-vehicle directory.
pub struct FilesystemImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn store(
        &self,
        vehicle_id: &Uuid,
        hash_hex: &str,
        bytes: &[u8],
    ) -> anyhow::Result<String> {
        let dir = self.root.join(vehicle_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let file = dir.join(format!("{}.jpg", hash_hex));
        tokio::fs::write(&file, bytes).await?;
        Ok(format!(
            "{}/{}/{}.jpg",
            self.public_base_url.trim_end_matches('/'),
            vehicle_id,
            hash_hex
        ))
    }
}

/// Downloads and stores vehicle images with global concurrency bounding
/// and per-call content deduplication.
pub struct ImageSyncer {
    source: Arc<dyn ImageSource>,
    store: Arc<dyn ImageStore>,
    // One semaphore per process, shared by every sync run.
    semaphore: Arc<Semaphore>,
    enabled: bool,
}

impl ImageSyncer {
    pub fn new(
        source: Arc<dyn ImageSource>,
        store: Arc<dyn ImageStore>,
        config: &ImageSyncConfig,
    ) -> Self {
        Self {
            source,
            store,
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
            enabled: config.enabled,
        }
    }

    /// Download the given URLs and store them for a vehicle, returning the
    /// hosted URLs of everything that succeeded. Order is not preserved.
    ///
    /// Duplicate payloads (by MD5) within this one call are stored once;
    /// the dedup set does not survive across calls.
    #[instrument(skip_all, fields(vehicle_id = %vehicle_id, url_count = urls.len()))]
    pub async fn download_and_store(
        &self,
        urls: &[String],
        vehicle_id: Uuid,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        if !self.enabled || urls.is_empty() {
            return Vec::new();
        }

        let seen_hashes: Arc<Mutex<HashSet<[u8; 16]>>> = Arc::new(Mutex::new(HashSet::new()));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            if cancel.is_cancelled() {
                break;
            }

            let url = url.clone();
            let source = self.source.clone();
            let store = self.store.clone();
            let semaphore = self.semaphore.clone();
            let seen_hashes = seen_hashes.clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit.ok()?,
                    _ = cancel.cancelled() => return None,
                };

                let bytes = tokio::select! {
                    result = source.fetch(&url) => match result {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(url = %url, "image download failed: {}", e);
                            counter!("image_sync_downloads_total", "outcome" => "error")
                                .increment(1);
                            return None;
                        }
                    },
                    _ = cancel.cancelled() => return None,
                };

                let hash: [u8; 16] = Md5::digest(&bytes).into();
                {
                    let mut seen = seen_hashes.lock().await;
                    if !seen.insert(hash) {
                        debug!(url = %url, "duplicate image payload skipped");
                        counter!("image_sync_downloads_total", "outcome" => "duplicate")
                            .increment(1);
                        return None;
                    }
                }

                match store.store(&vehicle_id, &hex::encode(hash), &bytes).await {
                    Ok(stored_url) => {
                        counter!("image_sync_downloads_total", "outcome" => "stored")
                            .increment(1);
                        Some(stored_url)
                    }
                    Err(e) => {
                        warn!(url = %url, "image store failed: {}", e);
                        counter!("image_sync_downloads_total", "outcome" => "error").increment(1);
                        None
                    }
                }
            }));
        }

        let mut stored = Vec::new();
        for handle in handles {
            if let Ok(Some(url)) = handle.await {
                stored.push(url);
            }
        }
        stored
    }
}
