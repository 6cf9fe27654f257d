//! Shared constants for end-to-end tests

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a test server to accept requests
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum time to wait for an import job to reach a terminal state
pub const JOB_TIMEOUT_MS: u64 = 10_000;

/// Interval between job status polls
pub const JOB_POLL_INTERVAL_MS: u64 = 25;

// ============================================================================
// Provider fixtures
// ============================================================================

/// Credentials the test server uses against the fake provider
pub const PROVIDER_USER: &str = "simplyrets";
pub const PROVIDER_PASS: &str = "simplyrets";

/// Bytes served for `.png` photos
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";

/// Bytes served for every other photo
pub const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";
