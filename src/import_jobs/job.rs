use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::models::{JobStatus, ProgressSnapshot};
use super::status::StatusReporter;

struct Completion {
    snapshot: ProgressSnapshot,
    at: Instant,
}

/// A single import run.
///
/// Shared between the registry, the pipeline task and status readers.
pub struct ImportJob {
    id: String,
    limit: usize,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
    reporter: StatusReporter,
    completion: Mutex<Option<Completion>>,
}

impl ImportJob {
    pub fn new(id: impl Into<String>, limit: usize) -> Self {
        Self {
            id: id.into(),
            limit,
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
            reporter: StatusReporter::new(),
            completion: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    pub fn publish(&self, snapshot: ProgressSnapshot) {
        self.reporter.publish(snapshot);
    }

    fn completion(&self) -> MutexGuard<'_, Option<Completion>> {
        self.completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the final snapshot. Only the first call has any effect.
    pub fn complete(&self, snapshot: ProgressSnapshot) -> bool {
        let mut completion = self.completion();
        if completion.is_some() {
            return false;
        }
        *completion = Some(Completion {
            snapshot,
            at: Instant::now(),
        });
        true
    }

    pub fn is_completed(&self) -> bool {
        self.completion().is_some()
    }

    /// When the job reached its terminal state, on the tokio clock.
    pub fn completed_instant(&self) -> Option<Instant> {
        self.completion().as_ref().map(|c| c.at)
    }

    pub fn final_snapshot(&self) -> Option<ProgressSnapshot> {
        self.completion().as_ref().map(|c| c.snapshot.clone())
    }

    /// Current progress: the final snapshot if terminal, else the latest
    /// published one, else a zeroed running snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        if let Some(snapshot) = self.final_snapshot() {
            return snapshot;
        }
        self.reporter
            .latest()
            .unwrap_or_else(|| ProgressSnapshot::running(self.started_at))
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            job_id: self.id.clone(),
            limit: self.limit,
            progress: self.snapshot(),
        }
    }
}
