//! Job control surface: start, inspect, cancel and list import jobs.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use super::job::ImportJob;
use super::models::{JobState, JobStatus};
use super::pipeline::ImportPipeline;
use super::registry::JobRegistry;
use crate::server::metrics::{record_import_job_finished, record_import_job_started};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("Limit must be between 1 and {max}")]
    InvalidLimit { limit: usize, max: usize },

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

/// Returned when a job has been accepted.
#[derive(Debug, Clone)]
pub struct StartedJob {
    pub job_id: String,
    pub limit: usize,
    pub started_at: DateTime<Utc>,
}

// =============================================================================
// Service
// =============================================================================

pub struct ImportService {
    registry: Arc<JobRegistry>,
    pipeline: Arc<ImportPipeline>,
    default_limit: usize,
    max_limit: usize,
}

impl ImportService {
    pub fn new(
        registry: Arc<JobRegistry>,
        pipeline: Arc<ImportPipeline>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        Self {
            registry,
            pipeline,
            default_limit,
            max_limit,
        }
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Register a new job and run it in the background.
    ///
    /// Returns as soon as the job is registered; the import itself outlives
    /// the caller.
    pub async fn start(&self, limit: usize) -> Result<StartedJob, ImportError> {
        if limit == 0 || limit > self.max_limit {
            return Err(ImportError::InvalidLimit {
                limit,
                max: self.max_limit,
            });
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let job = Arc::new(ImportJob::new(job_id.clone(), limit));
        let started = StartedJob {
            job_id: job_id.clone(),
            limit,
            started_at: job.started_at(),
        };

        self.registry.register(job.clone()).await;
        record_import_job_started();
        info!("Accepted import job {} (limit: {})", job_id, limit);

        let supervisor = tokio::spawn({
            let pipeline = self.pipeline.clone();
            let job = job.clone();
            async move { pipeline.run(job).await }
        });

        // Watches the supervisor so a panic still leaves a terminal job behind.
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let start_time = Instant::now();
            let state = match supervisor.await {
                Ok(snapshot) => snapshot.state,
                Err(join_err) => {
                    error!("Import job {} aborted: {}", job.id(), join_err);
                    let mut snapshot = job.snapshot();
                    snapshot.state = JobState::Failed;
                    snapshot.error_message = Some(format!("import task failed: {}", join_err));
                    snapshot.completed_at = Some(Utc::now());
                    if !registry.mark_completed(&job, snapshot.clone()).await {
                        job.complete(snapshot);
                    }
                    JobState::Failed
                }
            };
            record_import_job_finished(state.as_str(), start_time.elapsed());
        });

        Ok(started)
    }

    /// Current status of a registered job.
    pub async fn status(&self, job_id: &str) -> Result<JobStatus, ImportError> {
        self.registry
            .get(job_id)
            .await
            .map(|job| job.status())
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))
    }

    /// Cancel a job and forget it. Returns false if the id is unknown.
    pub async fn cancel(&self, job_id: &str) -> bool {
        let Some(job) = self.registry.get(job_id).await else {
            return false;
        };
        job.cancel();
        self.registry.remove(job_id).await;
        info!("Cancelled import job {}", job_id);
        true
    }

    /// Status of every registered job, oldest first.
    pub async fn list(&self) -> Vec<JobStatus> {
        let mut statuses: Vec<JobStatus> = self
            .registry
            .list()
            .await
            .iter()
            .map(|job| job.status())
            .collect();
        statuses.sort_by(|a, b| a.progress.started_at.cmp(&b.progress.started_at));
        statuses
    }

    /// Number of registered jobs that have not reached a terminal state.
    pub async fn active_jobs(&self) -> usize {
        self.registry
            .list()
            .await
            .iter()
            .filter(|job| !job.is_completed())
            .count()
    }
}
