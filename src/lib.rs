//! Listings Import Server Library
//!
//! Bulk import of property listings from an external provider: the job
//! registry, the batch pipeline and its collaborators, exposed for the
//! binary and for integration tests.

pub mod config;
pub mod import_jobs;
pub mod listing_source;
pub mod listing_store;
pub mod media;
pub mod server;

// Re-export commonly used types for convenience
pub use import_jobs::{ImportService, JobRegistry, JobState, ProgressSnapshot};
pub use listing_store::{ListingStore, SqliteListingStore};
pub use server::{run_server, RequestsLoggingLevel};
