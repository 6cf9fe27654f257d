//! Upstream listing provider.
//!
//! Fetches one page of raw listings per import job. The call is
//! all-or-nothing: any transport, status or decode problem fails the job.

mod client;
mod models;

pub use client::{SimplyRetsClient, SourceError};
pub use models::{ExternalAddress, ExternalListing, ExternalPropertyDetails, FlexibleString};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A source of external listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch up to `limit` listings.
    ///
    /// Returns `SourceError::Cancelled` if `cancel` fires before the
    /// response has been fully read.
    async fn fetch(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExternalListing>, SourceError>;
}
