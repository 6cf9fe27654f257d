//! Test server lifecycle management
//!
//! Each test gets an isolated import server wired to the real provider
//! client, photo fetcher and SQLite store, with its own temp directory.

use super::constants::*;
use super::fake_provider::FakeProvider;
use listings_import_server::config::ProviderSettings;
use listings_import_server::import_jobs::{
    ImportPipeline, ImportService, JobRegistry, PipelineSettings,
};
use listings_import_server::listing_source::SimplyRetsClient;
use listings_import_server::listing_store::{ListingStore, SqliteListingStore};
use listings_import_server::media::HttpMediaFetcher;
use listings_import_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated database and media directory
///
/// When dropped, the server shuts down and the temp directory is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Listing store for direct database access in tests
    pub store: Arc<SqliteListingStore>,

    /// Directory photos are downloaded into
    pub media_path: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server importing from `provider`
    pub async fn spawn(provider: &FakeProvider) -> Self {
        Self::spawn_with_settings(provider, PipelineSettings::default()).await
    }

    pub async fn spawn_with_settings(provider: &FakeProvider, settings: PipelineSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let media_path = temp_dir.path().join("images");

        let store = Arc::new(
            SqliteListingStore::open(&temp_dir.path().join("listings.db"))
                .expect("Failed to open listing store"),
        );

        let media = HttpMediaFetcher::new(media_path.clone(), 5, 4)
            .expect("Failed to create media fetcher");
        media.init().await.expect("Failed to create media directory");

        let source = SimplyRetsClient::new(&ProviderSettings {
            base_url: provider.base_url.clone(),
            username: PROVIDER_USER.to_string(),
            password: PROVIDER_PASS.to_string(),
            request_timeout_sec: 30,
        })
        .expect("Failed to create provider client");

        let registry = Arc::new(JobRegistry::default());
        let pipeline = Arc::new(ImportPipeline::new(
            Arc::new(source),
            Arc::new(media),
            store.clone() as Arc<dyn ListingStore>,
            registry.clone(),
            settings,
        ));
        let import_service = Arc::new(ImportService::new(registry, pipeline, 50, 500));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0,
            media_path: media_path.clone(),
        };
        let app = make_app(config, import_service);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            media_path,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
