//! Batch pipeline that drives a single import job to a terminal state.
//!
//! Listings are fetched once, then processed in fixed-size batches. Within a
//! batch every listing runs on its own task (bounded by a semaphore); the
//! batch is joined before progress is published and the next batch starts.
//! Cancellation is checked before each batch and observed by every worker.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job::ImportJob;
use super::models::{JobState, ProgressSnapshot};
use super::registry::JobRegistry;
use crate::config::{ImportSettings, PartialMediaPolicy};
use crate::listing_source::{ExternalListing, ListingSource, SourceError};
use crate::listing_store::{convert_listing, ListingStore};
use crate::media::{MediaError, MediaFetcher};
use crate::server::metrics::record_listing_outcome;

/// Why a single listing was not imported. Never fatal to the job.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing {listing_id}: {source}")]
    Media {
        listing_id: String,
        #[source]
        source: MediaError,
    },

    #[error("listing {listing_id}: failed to persist: {reason}")]
    Persist { listing_id: String, reason: String },

    #[error("listing {0}: skipped because the job was cancelled")]
    Cancelled(String),

    #[error("listing worker panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingOutcome {
    Imported,
    ImportedPartial,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub listing_concurrency: usize,
    pub partial_media_policy: PartialMediaPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ImportSettings::default())
    }
}

impl From<&ImportSettings> for PipelineSettings {
    fn from(settings: &ImportSettings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            listing_concurrency: settings.listing_concurrency.max(1),
            partial_media_policy: settings.partial_media_policy,
        }
    }
}

/// Processes one listing: media, conversion, persistence.
#[derive(Clone)]
struct ListingWorker {
    media: Arc<dyn MediaFetcher>,
    store: Arc<dyn ListingStore>,
    policy: PartialMediaPolicy,
    cancel: CancellationToken,
}

impl ListingWorker {
    async fn process(&self, listing: ExternalListing) -> Result<ListingOutcome, ListingError> {
        let listing_id = listing.listing_id.clone();
        if self.cancel.is_cancelled() {
            return Err(ListingError::Cancelled(listing_id));
        }

        let report = self
            .media
            .download_all(&listing.photos, &listing_id, &self.cancel)
            .await;

        let mut outcome = ListingOutcome::Imported;
        if let Some(err) = report.error() {
            if report.was_cancelled() {
                self.media.discard(&report.assets).await;
                return Err(ListingError::Cancelled(listing_id));
            }
            match self.policy {
                PartialMediaPolicy::DropListing => {
                    self.media.discard(&report.assets).await;
                    return Err(ListingError::Media {
                        listing_id,
                        source: err,
                    });
                }
                PartialMediaPolicy::KeepPartial => {
                    warn!(
                        "Listing {}: keeping {} of {} photos: {}",
                        listing_id,
                        report.assets.len(),
                        listing.photos.len(),
                        err
                    );
                    outcome = ListingOutcome::ImportedPartial;
                }
            }
        }

        let imported = convert_listing(&listing, report.assets.clone());
        let store = self.store.clone();
        let persisted = match tokio::task::spawn_blocking(move || store.create_listing(&imported))
            .await
        {
            Ok(Ok(row_id)) => Ok(row_id),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(join_err) => Err(join_err.to_string()),
        };
        let row_id = match persisted {
            Ok(row_id) => row_id,
            Err(reason) => {
                self.media.discard(&report.assets).await;
                return Err(ListingError::Persist { listing_id, reason });
            }
        };

        debug!("Listing {} stored with id {}", listing_id, row_id);
        Ok(outcome)
    }
}

pub struct ImportPipeline {
    source: Arc<dyn ListingSource>,
    media: Arc<dyn MediaFetcher>,
    store: Arc<dyn ListingStore>,
    registry: Arc<JobRegistry>,
    settings: PipelineSettings,
}

impl ImportPipeline {
    pub fn new(
        source: Arc<dyn ListingSource>,
        media: Arc<dyn MediaFetcher>,
        store: Arc<dyn ListingStore>,
        registry: Arc<JobRegistry>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            media,
            store,
            registry,
            settings,
        }
    }

    /// Run the job to a terminal state and return its final snapshot.
    pub async fn run(&self, job: Arc<ImportJob>) -> ProgressSnapshot {
        let mut progress = ProgressSnapshot::running(job.started_at());
        job.publish(progress.clone());
        info!("Import job {} started (limit: {})", job.id(), job.limit());

        let listings = match self.source.fetch(job.limit(), job.cancel_token()).await {
            Ok(listings) => listings,
            Err(SourceError::Cancelled) => {
                info!("Import job {} cancelled while fetching listings", job.id());
                progress.state = JobState::Cancelled;
                return self.finish(&job, progress).await;
            }
            Err(e) => {
                error!("Import job {} failed to fetch listings: {}", job.id(), e);
                progress.state = JobState::Failed;
                progress.error_message = Some(e.to_string());
                return self.finish(&job, progress).await;
            }
        };

        progress.total = listings.len();
        job.publish(progress.clone());

        let worker = ListingWorker {
            media: self.media.clone(),
            store: self.store.clone(),
            policy: self.settings.partial_media_policy,
            cancel: job.cancel_token().clone(),
        };

        let mut remaining = listings.into_iter();
        let mut batch_number = 0;
        while !remaining.as_slice().is_empty() {
            if job.is_cancelled() {
                info!(
                    "Import job {} cancelled after {} batches",
                    job.id(),
                    batch_number
                );
                progress.state = JobState::Cancelled;
                return self.finish(&job, progress).await;
            }

            let batch: Vec<ExternalListing> =
                remaining.by_ref().take(self.settings.batch_size).collect();
            batch_number += 1;
            debug!(
                "Import job {}: batch {} with {} listings",
                job.id(),
                batch_number,
                batch.len()
            );

            for result in self.process_batch(&worker, batch).await {
                match result {
                    Ok(ListingOutcome::Imported) => {
                        progress.processed += 1;
                        record_listing_outcome("imported");
                    }
                    Ok(ListingOutcome::ImportedPartial) => {
                        progress.processed += 1;
                        progress.partial_media += 1;
                        record_listing_outcome("partial");
                    }
                    Err(ListingError::Cancelled(id)) => {
                        progress.failed += 1;
                        debug!("Import job {}: listing {} skipped", job.id(), id);
                        record_listing_outcome("cancelled");
                    }
                    Err(e) => {
                        progress.failed += 1;
                        warn!("Import job {}: {}", job.id(), e);
                        record_listing_outcome("failed");
                    }
                }
            }
            job.publish(progress.clone());
        }

        progress.state = if job.is_cancelled() {
            JobState::Cancelled
        } else {
            JobState::Completed
        };
        self.finish(&job, progress).await
    }

    async fn process_batch(
        &self,
        worker: &ListingWorker,
        batch: Vec<ExternalListing>,
    ) -> Vec<Result<ListingOutcome, ListingError>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.listing_concurrency));
        let mut tasks = JoinSet::new();

        for listing in batch {
            let worker = worker.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Err(ListingError::Cancelled(listing.listing_id));
                };
                worker.process(listing).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            results.push(match joined {
                Ok(result) => result,
                Err(join_err) => Err(ListingError::Panicked(join_err.to_string())),
            });
        }
        results
    }

    async fn finish(&self, job: &Arc<ImportJob>, mut progress: ProgressSnapshot) -> ProgressSnapshot {
        progress.completed_at = Some(Utc::now());
        info!(
            "Import job {} {}: {} processed, {} failed, {} total",
            job.id(),
            progress.state,
            progress.processed,
            progress.failed,
            progress.total
        );

        if !self
            .registry
            .mark_completed(job, progress.clone())
            .await
        {
            // Cancelled or replaced jobs are no longer registered under their id.
            job.publish(progress.clone());
            job.complete(progress.clone());
        }
        progress
    }
}
