//! Process-wide table of live and recently finished import jobs.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::job::ImportJob;
use super::models::ProgressSnapshot;

/// How long a finished job stays queryable.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(5 * 60);

pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<ImportJob>>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_RETENTION)
    }
}

impl JobRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Register a job under its id. An existing entry with the same id is replaced.
    pub async fn register(&self, job: Arc<ImportJob>) {
        let mut jobs = self.jobs.write().await;
        if let Some(previous) = jobs.insert(job.id().to_string(), job) {
            previous.reporter().close();
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ImportJob>> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Remove a job and close its status reporter.
    pub async fn remove(&self, id: &str) -> Option<Arc<ImportJob>> {
        let removed = self.jobs.write().await.remove(id);
        if let Some(job) = &removed {
            job.reporter().close();
            debug!("Removed import job {}", id);
        }
        removed
    }

    /// Store the final snapshot on `job` and schedule its cleanup once the
    /// retention window has passed.
    ///
    /// Returns false, leaving `job` untouched, if `job` is not the instance
    /// currently registered under its id.
    pub async fn mark_completed(
        self: &Arc<Self>,
        job: &Arc<ImportJob>,
        snapshot: ProgressSnapshot,
    ) -> bool {
        match self.get(job.id()).await {
            Some(registered) if Arc::ptr_eq(&registered, job) => {}
            _ => return false,
        }
        job.publish(snapshot.clone());
        job.complete(snapshot);

        let registry: Weak<Self> = Arc::downgrade(self);
        let expected: Weak<ImportJob> = Arc::downgrade(job);
        let retention = self.retention;
        let id = job.id().to_string();
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if let (Some(registry), Some(expected)) = (registry.upgrade(), expected.upgrade()) {
                registry.remove_if_expired(&id, Some(&expected)).await;
            }
        });
        true
    }

    /// Remove the job under `id` if it is terminal and finished at least one
    /// retention window ago.
    pub async fn cleanup_if_expired(&self, id: &str) -> bool {
        self.remove_if_expired(id, None).await
    }

    /// Same as [`cleanup_if_expired`](Self::cleanup_if_expired), restricted to
    /// `expected` when given.
    async fn remove_if_expired(&self, id: &str, expected: Option<&Arc<ImportJob>>) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get(id) else {
            return false;
        };
        if expected.is_some_and(|expected| !Arc::ptr_eq(expected, job)) {
            return false;
        }
        let expired = match job.completed_instant() {
            Some(completed_at) => completed_at.elapsed() >= self.retention,
            None => false,
        };
        if !expired {
            return false;
        }
        if let Some(job) = jobs.remove(id) {
            job.reporter().close();
        }
        info!("Cleaned up finished import job {}", id);
        true
    }

    pub async fn list(&self) -> Vec<Arc<ImportJob>> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
