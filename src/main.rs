use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use listings_import_server::config;
use listings_import_server::import_jobs::{
    ImportPipeline, ImportService, JobRegistry, PipelineSettings,
};
use listings_import_server::listing_source::SimplyRetsClient;
use listings_import_server::listing_store::SqliteListingStore;
use listings_import_server::media::HttpMediaFetcher;
use listings_import_server::server::{metrics, run_server, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding listings.db. Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// Directory downloaded listing photos are written to and served from.
    /// Defaults to `<db_dir>/images`.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the listing provider.
    #[clap(long)]
    pub provider_url: Option<String>,

    /// Basic auth username for the listing provider.
    #[clap(long)]
    pub provider_username: Option<String>,

    /// Basic auth password for the listing provider.
    #[clap(long)]
    pub provider_password: Option<String>,

    /// Timeout in seconds for provider and photo requests.
    #[clap(long)]
    pub request_timeout_sec: Option<u64>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            media_path: args.media_path.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            provider_url: args.provider_url.clone(),
            provider_username: args.provider_username.clone(),
            provider_password: args.provider_password.clone(),
            request_timeout_sec: args.request_timeout_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  media_path: {:?}", app_config.media_path);
    info!("  port: {}", app_config.port);
    info!("  provider: {}", app_config.provider.base_url);
    info!(
        "  import: batch_size={} listing_concurrency={} media_concurrency={} partial_media_policy={}",
        app_config.import.batch_size,
        app_config.import.listing_concurrency,
        app_config.import.media_concurrency,
        app_config.import.partial_media_policy
    );

    info!("Initializing metrics...");
    metrics::init_metrics();

    if !app_config.listings_db_path().exists() {
        info!(
            "Creating new listings database at {:?}",
            app_config.listings_db_path()
        );
    }
    let store = Arc::new(SqliteListingStore::open(&app_config.listings_db_path())?);

    let media = HttpMediaFetcher::new(
        app_config.media_path.clone(),
        app_config.provider.request_timeout_sec,
        app_config.import.media_concurrency,
    )?;
    media.init().await?;

    let source = SimplyRetsClient::new(&app_config.provider)?;

    let registry = Arc::new(JobRegistry::new(Duration::from_secs(
        app_config.import.job_retention_secs,
    )));
    let pipeline = Arc::new(ImportPipeline::new(
        Arc::new(source),
        Arc::new(media),
        store,
        registry.clone(),
        PipelineSettings::from(&app_config.import),
    ));
    let import_service = Arc::new(ImportService::new(
        registry,
        pipeline,
        app_config.import.default_limit,
        app_config.import.max_limit,
    ));

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    tokio::select! {
        result = run_server(
            import_service,
            app_config.logging_level.clone(),
            app_config.port,
            app_config.metrics_port,
            app_config.media_path.clone(),
        ) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
