//! HTTP implementation of [`MediaFetcher`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{MediaDownloadReport, MediaError, MediaFailure, MediaFetcher};
use crate::listing_store::MediaAsset;
use crate::server::metrics::record_media_download;

/// Public URL prefix under which the media directory is served.
pub const MEDIA_URL_PREFIX: &str = "/images";

/// File extension for a photo, inferred from its `Content-Type`.
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let content_type = match content_type {
        Some(ct) => ct.to_ascii_lowercase(),
        None => return "jpg",
    };
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("gif") {
        "gif"
    } else if content_type.contains("webp") {
        "webp"
    } else {
        "jpg"
    }
}

/// Listing ids come from the provider; keep only characters safe in a file name.
///
/// Ids that had to be changed get a short hash of the raw id appended so two
/// different ids never share a stem.
fn file_stem(listing_id: &str) -> String {
    let sanitized: String = listing_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !sanitized.is_empty() && sanitized == listing_id {
        return sanitized;
    }

    let digest = format!("{:x}", Sha256::digest(listing_id.as_bytes()));
    let prefix = if sanitized.is_empty() {
        "listing"
    } else {
        sanitized.as_str()
    };
    format!("{}-{}", prefix, &digest[..8])
}

/// Downloads photos over HTTP into a local directory.
pub struct HttpMediaFetcher {
    client: reqwest::Client,
    media_dir: PathBuf,
    concurrency: usize,
}

impl HttpMediaFetcher {
    /// Create a new fetcher writing into `media_dir`.
    ///
    /// At most `concurrency` photos of one listing download at the same time.
    pub fn new(media_dir: PathBuf, timeout_sec: u64, concurrency: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            media_dir,
            concurrency: concurrency.max(1),
        })
    }

    /// Create the media directory if it does not exist yet.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.media_dir)
            .await
            .with_context(|| format!("Failed to create media directory {:?}", self.media_dir))
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }
}

struct DownloadTask {
    client: reqwest::Client,
    media_dir: PathBuf,
    url: String,
    stem: String,
    ordinal: usize,
}

impl DownloadTask {
    async fn run(
        self,
        semaphore: Arc<Semaphore>,
        cancel: CancellationToken,
    ) -> Result<MediaAsset, MediaError> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.acquire_owned() => permit.ok(),
        };
        let Some(_permit) = permit else {
            return Err(MediaError::Cancelled { url: self.url });
        };

        let url = self.url.clone();
        let part_path = self.part_path();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // The dropped download may have left a partial file behind.
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(MediaError::Cancelled { url })
            }
            result = self.fetch_to_file() => result,
        }
    }

    /// Download target until the body is complete.
    fn part_path(&self) -> PathBuf {
        self.media_dir
            .join(format!("{}_{}.part", self.stem, self.ordinal))
    }

    async fn fetch_to_file(self) -> Result<MediaAsset, MediaError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| MediaError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let extension = extension_for_content_type(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let bytes = response.bytes().await.map_err(|source| MediaError::Request {
            url: self.url.clone(),
            source,
        })?;

        let file_name = format!("{}_{}.{}", self.stem, self.ordinal, extension);
        let dest = self.media_dir.join(&file_name);
        let part = self.part_path();
        tokio::fs::write(&part, &bytes)
            .await
            .map_err(|source| MediaError::Io {
                path: part.display().to_string(),
                source,
            })?;
        tokio::fs::rename(&part, &dest)
            .await
            .map_err(|source| MediaError::Io {
                path: dest.display().to_string(),
                source,
            })?;

        debug!("Stored {} ({} bytes) as {}", self.url, bytes.len(), file_name);

        Ok(MediaAsset {
            url: self.url,
            local_url: format!("{}/{}", MEDIA_URL_PREFIX, file_name),
            caption: format!("Property image {}", self.ordinal + 1),
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn download_all(
        &self,
        urls: &[String],
        listing_id: &str,
        cancel: &CancellationToken,
    ) -> MediaDownloadReport {
        let mut report = MediaDownloadReport::default();
        if urls.is_empty() {
            return report;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let stem = file_stem(listing_id);

        let handles: Vec<_> = urls
            .iter()
            .enumerate()
            .map(|(ordinal, url)| {
                let task = DownloadTask {
                    client: self.client.clone(),
                    media_dir: self.media_dir.clone(),
                    url: url.clone(),
                    stem: stem.clone(),
                    ordinal,
                };
                let handle = tokio::spawn(task.run(semaphore.clone(), cancel.clone()));
                (ordinal, url, handle)
            })
            .collect();

        for (ordinal, url, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(MediaError::Task {
                    url: url.clone(),
                    reason: join_err.to_string(),
                }),
            };

            match result {
                Ok(asset) => {
                    record_media_download("success");
                    report.assets.push(asset);
                }
                Err(error) => {
                    if matches!(error, MediaError::Cancelled { .. }) {
                        record_media_download("cancelled");
                    } else {
                        record_media_download("failed");
                        warn!("Listing {}: {}", listing_id, error);
                    }
                    report.failures.push(MediaFailure { ordinal, error });
                }
            }
        }

        report
    }

    async fn discard(&self, assets: &[MediaAsset]) {
        for asset in assets {
            let Some(file_name) = asset
                .local_url
                .strip_prefix(MEDIA_URL_PREFIX)
                .map(|name| name.trim_start_matches('/'))
            else {
                continue;
            };
            let path = self.media_dir.join(file_name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Discarded {:?}", path),
                Err(e) => warn!("Failed to discard {:?}: {}", path, e),
            }
        }
    }
}
