//! Bulk listing import jobs.
//!
//! A job fetches a page of listings from the provider, then downloads photos,
//! converts and stores each listing in concurrent batches. Jobs run in the
//! background and are tracked by a [`JobRegistry`] until a retention window
//! after they finish.

mod job;
mod models;
mod pipeline;
mod registry;
mod service;
mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use job::ImportJob;
pub use models::{JobState, JobStatus, ProgressSnapshot};
pub use pipeline::{ImportPipeline, ListingError, PipelineSettings};
pub use registry::{JobRegistry, DEFAULT_JOB_RETENTION};
pub use service::{ImportError, ImportService, StartedJob};
pub use status::StatusReporter;
