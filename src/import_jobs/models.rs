use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a job's progress.
///
/// `total` is zero until the listing fetch returns. From then on
/// `processed + failed <= total`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub state: JobState,
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    /// Listings persisted with only some of their photos.
    pub partial_media: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProgressSnapshot {
    /// A fresh running snapshot with every counter at zero.
    pub fn running(started_at: DateTime<Utc>) -> Self {
        Self {
            state: JobState::Running,
            total: 0,
            processed: 0,
            failed: 0,
            partial_media: 0,
            started_at,
            completed_at: None,
            error_message: None,
        }
    }

    /// Number of listings that have finished, successfully or not.
    pub fn finished(&self) -> usize {
        self.processed + self.failed
    }
}

/// Status of a job as exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub job_id: String,
    pub limit: usize,
    #[serde(flatten)]
    pub progress: ProgressSnapshot,
}
