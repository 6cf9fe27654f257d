//! Latest-value progress channel between a job's pipeline and its readers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::models::ProgressSnapshot;

#[derive(Default)]
struct ReporterState {
    latest: Option<ProgressSnapshot>,
    version: u64,
    closed: bool,
}

/// Holds the most recent snapshot published for a job.
///
/// Publishing replaces the previous value and never waits on readers.
/// Once closed, publishes are dropped and readers keep the last value.
#[derive(Default)]
pub struct StatusReporter {
    state: Mutex<ReporterState>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, snapshot: ProgressSnapshot) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.latest = Some(snapshot);
        state.version += 1;
    }

    pub fn latest(&self) -> Option<ProgressSnapshot> {
        self.lock().latest.clone()
    }

    /// Number of accepted publishes so far.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
