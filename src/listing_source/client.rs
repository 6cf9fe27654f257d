//! HTTP client for the SimplyRETS-compatible listing provider.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::models::ExternalListing;
use super::ListingSource;
use crate::config::ProviderSettings;

/// Errors returned by the listing provider. Every variant ends the job.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to fetch listings: {0}")]
    Request(#[source] reqwest::Error),

    #[error("listing provider returned status {0}")]
    Status(u16),

    #[error("failed to decode listings response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("listing fetch was cancelled")]
    Cancelled,
}

/// HTTP client for the `/properties` endpoint.
pub struct SimplyRetsClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl SimplyRetsClient {
    /// Create a new provider client.
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        // Ensure base_url doesn't have trailing slash
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    /// Get the base URL of the provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_listings(&self, limit: usize) -> Result<Vec<ExternalListing>, SourceError> {
        let url = format!("{}/properties", self.base_url);
        debug!("Requesting {} (limit: {})", url, limit);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(SourceError::Request)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Listing provider returned status {}", status);
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(SourceError::Request)?;
        let listings: Vec<ExternalListing> =
            serde_json::from_slice(&body).map_err(SourceError::Decode)?;

        info!("Fetched {} listings from provider", listings.len());
        Ok(listings)
    }
}

#[async_trait]
impl ListingSource for SimplyRetsClient {
    async fn fetch(
        &self,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExternalListing>, SourceError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SourceError::Cancelled),
            result = self.request_listings(limit) => result,
        }
    }
}
