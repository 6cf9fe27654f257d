use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info};

use super::metrics::metrics_handler;
use super::{log_requests, make_import_routes, state::*, RequestsLoggingLevel, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub service: &'static str,
    pub uptime: String,
    pub active_jobs: usize,
}

pub(super) fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        service: "listings-import",
        uptime: format_uptime(state.start_time.elapsed()),
        active_jobs: state.import_service.active_jobs().await,
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig, import_service: GuardedImportService) -> Router {
    let state = ServerState::new(config.clone(), import_service);

    let import_routes = make_import_routes(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    home_router
        .nest("/v1/import", import_routes)
        .nest_service("/images", ServeDir::new(&config.media_path))
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    import_service: GuardedImportService,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    metrics_port: u16,
    media_path: PathBuf,
) -> Result<()> {
    let config = ServerConfig {
        requests_logging_level,
        port,
        metrics_port,
        media_path,
    };
    let app = make_app(config, import_service);

    let metrics_listener = TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {:?}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
