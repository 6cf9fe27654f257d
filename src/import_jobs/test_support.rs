//! In-memory collaborators for pipeline and service tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::listing_source::{ExternalAddress, ExternalListing, ListingSource, SourceError};
use crate::listing_store::{ImportedListing, ListingStore, MediaAsset};
use crate::media::{MediaDownloadReport, MediaError, MediaFailure, MediaFetcher};

pub fn listing(id: &str) -> ExternalListing {
    ExternalListing {
        listing_id: id.to_string(),
        address: ExternalAddress {
            full: format!("{} Main St", id),
            street_number: "1".into(),
            street_name: "Main St".to_string(),
            ..Default::default()
        },
        list_price: 100_000.0,
        ..Default::default()
    }
}

/// `count` listings named `listing-0`, `listing-1`, ...
pub fn listings(count: usize) -> Vec<ExternalListing> {
    (0..count)
        .map(|i| listing(&format!("listing-{}", i)))
        .collect()
}

enum SourceBehavior {
    Listings(Vec<ExternalListing>),
    Status(u16),
    Hang,
    Panic,
}

pub struct FakeSource {
    behavior: SourceBehavior,
}

impl FakeSource {
    pub fn ok(listings: Vec<ExternalListing>) -> Self {
        Self {
            behavior: SourceBehavior::Listings(listings),
        }
    }

    pub fn failing_with_status(status: u16) -> Self {
        Self {
            behavior: SourceBehavior::Status(status),
        }
    }

    /// Never answers; only cancellation ends the fetch.
    pub fn hanging() -> Self {
        Self {
            behavior: SourceBehavior::Hang,
        }
    }

    pub fn panicking() -> Self {
        Self {
            behavior: SourceBehavior::Panic,
        }
    }
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn fetch(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExternalListing>, SourceError> {
        match &self.behavior {
            SourceBehavior::Listings(listings) => {
                Ok(listings.iter().take(limit).cloned().collect())
            }
            SourceBehavior::Status(status) => Err(SourceError::Status(*status)),
            SourceBehavior::Hang => {
                cancel.cancelled().await;
                Err(SourceError::Cancelled)
            }
            SourceBehavior::Panic => panic!("provider exploded"),
        }
    }
}

/// Succeeds for every URL except those containing "broken".
#[derive(Default)]
pub struct FakeMediaFetcher {
    requested: Mutex<HashSet<String>>,
    discarded: Mutex<Vec<String>>,
    cancel_trigger: Mutex<Option<(String, CancellationToken)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeMediaFetcher {
    /// Cancel `token` when `url` is requested, failing that photo.
    pub fn cancel_on_url(&self, url: &str, token: CancellationToken) {
        *self.cancel_trigger.lock().unwrap() = Some((url.to_string(), token));
    }

    pub fn was_requested(&self, listing_id: &str) -> bool {
        self.requested.lock().unwrap().contains(listing_id)
    }

    /// `local_url`s of every discarded photo.
    pub fn discarded(&self) -> Vec<String> {
        self.discarded.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeMediaFetcher {
    async fn download_all(
        &self,
        urls: &[String],
        listing_id: &str,
        cancel: &CancellationToken,
    ) -> MediaDownloadReport {
        self.requested
            .lock()
            .unwrap()
            .insert(listing_id.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let trigger = self.cancel_trigger.lock().unwrap().clone();
        let mut report = MediaDownloadReport::default();
        for (ordinal, url) in urls.iter().enumerate() {
            if let Some((trigger_url, token)) = &trigger {
                if trigger_url == url {
                    token.cancel();
                }
            }

            let error = if cancel.is_cancelled() {
                Some(MediaError::Cancelled { url: url.clone() })
            } else if url.contains("broken") {
                Some(MediaError::Status {
                    url: url.clone(),
                    status: 404,
                })
            } else {
                None
            };

            match error {
                Some(error) => report.failures.push(MediaFailure { ordinal, error }),
                None => report.assets.push(MediaAsset {
                    url: url.clone(),
                    local_url: format!("/images/{}_{}.jpg", listing_id, ordinal),
                    caption: format!("Property image {}", ordinal + 1),
                }),
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        report
    }

    async fn discard(&self, assets: &[MediaAsset]) {
        self.discarded
            .lock()
            .unwrap()
            .extend(assets.iter().map(|a| a.local_url.clone()));
    }
}

#[derive(Default)]
pub struct FakeStore {
    listings: Mutex<Vec<ImportedListing>>,
    fail_for: Option<String>,
}

impl FakeStore {
    pub fn failing_for(external_id: &str) -> Self {
        Self {
            listings: Mutex::new(Vec::new()),
            fail_for: Some(external_id.to_string()),
        }
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.listings
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.external_id.as_deref() == Some(external_id))
    }

    pub fn photos_of(&self, external_id: &str) -> Vec<MediaAsset> {
        self.listings
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.external_id.as_deref() == Some(external_id))
            .map(|l| l.photos.clone())
            .unwrap_or_default()
    }

    pub fn stored(&self) -> usize {
        self.listings.lock().unwrap().len()
    }
}

impl ListingStore for FakeStore {
    fn create_listing(&self, listing: &ImportedListing) -> Result<i64> {
        if listing.external_id.is_some() && listing.external_id == self.fail_for {
            bail!("disk full");
        }
        let mut listings = self.listings.lock().unwrap();
        listings.push(listing.clone());
        Ok(listings.len() as i64)
    }

    fn get_by_external_id(&self, external_id: &str) -> Result<Option<ImportedListing>> {
        Ok(self
            .listings
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.listings.lock().unwrap().len())
    }
}
