//! Listing photo downloads.

mod fetcher;

pub use fetcher::{extension_for_content_type, HttpMediaFetcher};

use crate::listing_store::MediaAsset;
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to download {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download {url}: status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {url} was cancelled")]
    Cancelled { url: String },

    #[error("download task for {url} failed: {reason}")]
    Task { url: String, reason: String },

    #[error("some images failed to download: {0}")]
    Partial(String),
}

/// A single failed photo of a listing.
#[derive(Debug)]
pub struct MediaFailure {
    pub ordinal: usize,
    pub error: MediaError,
}

/// Outcome of downloading every photo of one listing.
#[derive(Debug, Default)]
pub struct MediaDownloadReport {
    /// Successfully stored photos, in ordinal order.
    pub assets: Vec<MediaAsset>,
    pub failures: Vec<MediaFailure>,
}

impl MediaDownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// True if at least one failure was caused by cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f.error, MediaError::Cancelled { .. }))
    }

    /// Combined error describing every failure, or `None` if all photos downloaded.
    pub fn error(&self) -> Option<MediaError> {
        if self.failures.is_empty() {
            return None;
        }
        let joined = self
            .failures
            .iter()
            .map(|f| f.error.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Some(MediaError::Partial(joined))
    }
}

/// Downloads the photos of a listing into local storage.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download every URL, returning what succeeded and what failed.
    ///
    /// Never fails as a whole; per-photo problems are in the report.
    async fn download_all(
        &self,
        urls: &[String],
        listing_id: &str,
        cancel: &CancellationToken,
    ) -> MediaDownloadReport;

    /// Delete stored photos of a listing that was not persisted.
    async fn discard(&self, assets: &[MediaAsset]);
}
