//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per import endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Import Jobs
    // ========================================================================

    /// POST /v1/import/jobs with `{"limit": limit}`
    pub async fn start_job(&self, limit: i64) -> Response {
        self.client
            .post(format!("{}/v1/import/jobs", self.base_url))
            .json(&json!({ "limit": limit }))
            .send()
            .await
            .expect("Start job request failed")
    }

    /// POST /v1/import/jobs with no body
    pub async fn start_job_with_defaults(&self) -> Response {
        self.client
            .post(format!("{}/v1/import/jobs", self.base_url))
            .send()
            .await
            .expect("Start job request failed")
    }

    /// Starts a job and returns its id, asserting it was accepted
    pub async fn start_job_id(&self, limit: i64) -> String {
        let response = self.start_job(limit).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body: Value = response.json().await.expect("Invalid start job body");
        body["job_id"]
            .as_str()
            .expect("Missing job_id")
            .to_string()
    }

    /// GET /v1/import/jobs/{id}
    pub async fn get_job(&self, job_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/import/jobs/{}", self.base_url, job_id))
            .send()
            .await
            .expect("Get job request failed")
    }

    /// POST /v1/import/jobs/{id}/cancel
    pub async fn cancel_job(&self, job_id: &str) -> Response {
        self.client
            .post(format!("{}/v1/import/jobs/{}/cancel", self.base_url, job_id))
            .send()
            .await
            .expect("Cancel job request failed")
    }

    /// GET /v1/import/jobs
    pub async fn list_jobs(&self) -> Response {
        self.client
            .get(format!("{}/v1/import/jobs", self.base_url))
            .send()
            .await
            .expect("List jobs request failed")
    }

    /// GET /v1/import/health
    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/v1/import/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    /// GET an arbitrary server path, e.g. a photo's `local_url`
    pub async fn get_path(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Polls a job until it reaches a terminal state and returns its status
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        let start = std::time::Instant::now();
        loop {
            let response = self.get_job(job_id).await;
            assert_eq!(response.status(), StatusCode::OK, "job {} vanished", job_id);
            let status: Value = response.json().await.expect("Invalid job status body");
            match status["state"].as_str() {
                Some("completed") | Some("failed") | Some("cancelled") => return status,
                _ => {}
            }
            if start.elapsed() > Duration::from_millis(JOB_TIMEOUT_MS) {
                panic!("Job {} did not finish within {}ms", job_id, JOB_TIMEOUT_MS);
            }
            tokio::time::sleep(Duration::from_millis(JOB_POLL_INTERVAL_MS)).await;
        }
    }
}
