//! Import job HTTP routes.
//!
//! Provides endpoints for:
//! - Starting an import job
//! - Polling and listing job status
//! - Cancelling a job
//! - Service health

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::import_jobs::{ImportError, JobStatus};
use super::server::format_uptime;
use super::state::{GuardedImportService, ServerState};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StartJobBody {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StartJobQuery {
    limit: Option<String>,
}

#[derive(Debug, Serialize)]
struct StartJobResponse {
    job_id: String,
    message: &'static str,
    limit: usize,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct CancelJobResponse {
    message: &'static str,
    job_id: String,
}

#[derive(Debug, Serialize)]
struct JobListResponse {
    jobs: Vec<JobStatus>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: DateTime<Utc>,
    uptime: String,
    active_jobs: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Limit from the JSON body if it parses, else from `?limit=`, else `default`.
/// Unparseable values are ignored.
fn requested_limit(body: &[u8], query: &StartJobQuery, default: usize) -> i64 {
    if !body.is_empty() {
        if let Ok(StartJobBody { limit: Some(limit) }) = serde_json::from_slice(body) {
            return limit;
        }
    }
    query
        .limit
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default as i64)
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /jobs - Start an import job
async fn start_job(
    State(service): State<GuardedImportService>,
    Query(query): Query<StartJobQuery>,
    body: Bytes,
) -> Response {
    let limit = requested_limit(&body, &query, service.default_limit());
    // Negative limits map to zero, which the service rejects.
    let limit = usize::try_from(limit).unwrap_or(0);

    match service.start(limit).await {
        Ok(started) => (
            StatusCode::ACCEPTED,
            Json(StartJobResponse {
                job_id: started.job_id,
                message: "Import started",
                limit: started.limit,
                started_at: started.started_at,
            }),
        )
            .into_response(),
        Err(e @ ImportError::InvalidLimit { .. }) => {
            debug!("Rejected import request: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /jobs/{id} - Job status
async fn get_job(
    State(service): State<GuardedImportService>,
    Path(job_id): Path<String>,
) -> Response {
    match service.status(&job_id).await {
        Ok(status) => Json(status).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "Job not found"),
    }
}

/// POST /jobs/{id}/cancel - Cancel a job
async fn cancel_job(
    State(service): State<GuardedImportService>,
    Path(job_id): Path<String>,
) -> Response {
    if !service.cancel(&job_id).await {
        return error_response(StatusCode::NOT_FOUND, "Job not found or already completed");
    }
    Json(CancelJobResponse {
        message: "Job cancelled successfully",
        job_id,
    })
    .into_response()
}

/// GET /jobs - All registered jobs
async fn list_jobs(State(service): State<GuardedImportService>) -> impl IntoResponse {
    Json(JobListResponse {
        jobs: service.list().await,
    })
}

/// GET /health
async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "listings-import",
        timestamp: Utc::now(),
        uptime: format_uptime(state.start_time.elapsed()),
        active_jobs: state.import_service.active_jobs().await,
    })
}

pub fn make_import_routes(state: ServerState) -> Router {
    Router::new()
        .route("/jobs", post(start_job).get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
        .route("/health", get(health))
        .with_state(state)
}
