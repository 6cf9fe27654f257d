mod file_config;

pub use file_config::{FileConfig, ImportConfig, ProviderConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_PROVIDER_URL: &str = "https://api.simplyrets.com";
pub const DEFAULT_PROVIDER_USERNAME: &str = "simplyrets";
pub const DEFAULT_PROVIDER_PASSWORD: &str = "simplyrets";
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub provider_url: Option<String>,
    pub provider_username: Option<String>,
    pub provider_password: Option<String>,
    pub request_timeout_sec: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub media_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Feature configs (with defaults)
    pub provider: ProviderSettings,
    pub import: ImportSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let media_path = file
            .media_path
            .map(PathBuf::from)
            .or_else(|| cli.media_path.clone())
            .unwrap_or_else(|| db_dir.join("images"));

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let provider_file = file.provider.unwrap_or_default();
        let provider = ProviderSettings {
            base_url: provider_file
                .base_url
                .or_else(|| cli.provider_url.clone())
                .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            username: provider_file
                .username
                .or_else(|| cli.provider_username.clone())
                .unwrap_or_else(|| DEFAULT_PROVIDER_USERNAME.to_string()),
            password: provider_file
                .password
                .or_else(|| cli.provider_password.clone())
                .unwrap_or_else(|| DEFAULT_PROVIDER_PASSWORD.to_string()),
            request_timeout_sec: provider_file
                .request_timeout_sec
                .or(cli.request_timeout_sec)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SEC),
        };
        if provider.request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than zero");
        }

        let import = ImportSettings::from_file(file.import.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            media_path,
            port,
            metrics_port,
            logging_level,
            provider,
            import,
        })
    }

    pub fn listings_db_path(&self) -> PathBuf {
        self.db_dir.join("listings.db")
    }
}

/// Connection settings for the upstream listing provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub request_timeout_sec: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            username: DEFAULT_PROVIDER_USERNAME.to_string(),
            password: DEFAULT_PROVIDER_PASSWORD.to_string(),
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
        }
    }
}

/// What to do with a listing when some, but not all, of its photos fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PartialMediaPolicy {
    /// The listing counts as failed and is not persisted.
    #[default]
    #[value(name = "drop_listing", alias = "drop-listing")]
    DropListing,
    /// The listing is persisted with the photos that did download.
    #[value(name = "keep_partial", alias = "keep-partial")]
    KeepPartial,
}

impl std::fmt::Display for PartialMediaPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartialMediaPolicy::DropListing => write!(f, "drop_listing"),
            PartialMediaPolicy::KeepPartial => write!(f, "keep_partial"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub listing_concurrency: usize,
    pub media_concurrency: usize,
    pub job_retention_secs: u64,
    pub default_limit: usize,
    pub max_limit: usize,
    pub partial_media_policy: PartialMediaPolicy,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            listing_concurrency: 10,
            media_concurrency: 4,
            job_retention_secs: 300, // 5 minutes
            default_limit: 50,
            max_limit: 500,
            partial_media_policy: PartialMediaPolicy::DropListing,
        }
    }
}

impl ImportSettings {
    fn from_file(file: ImportConfig) -> Result<Self> {
        let defaults = Self::default();

        let partial_media_policy = match file.partial_media_policy {
            Some(s) => match parse_partial_media_policy(&s) {
                Some(policy) => policy,
                None => bail!("Unknown partial_media_policy: {:?}", s),
            },
            None => defaults.partial_media_policy,
        };

        let settings = Self {
            batch_size: file.batch_size.unwrap_or(defaults.batch_size),
            listing_concurrency: file
                .listing_concurrency
                .unwrap_or(defaults.listing_concurrency),
            media_concurrency: file.media_concurrency.unwrap_or(defaults.media_concurrency),
            job_retention_secs: file
                .job_retention_secs
                .unwrap_or(defaults.job_retention_secs),
            default_limit: file.default_limit.unwrap_or(defaults.default_limit),
            max_limit: file.max_limit.unwrap_or(defaults.max_limit),
            partial_media_policy,
        };

        if settings.batch_size == 0 {
            bail!("import.batch_size must be at least 1");
        }
        if settings.listing_concurrency == 0 || settings.media_concurrency == 0 {
            bail!("import concurrency limits must be at least 1");
        }
        if settings.max_limit == 0 {
            bail!("import.max_limit must be at least 1");
        }
        if settings.default_limit == 0 || settings.default_limit > settings.max_limit {
            bail!(
                "import.default_limit must be between 1 and {}",
                settings.max_limit
            );
        }

        Ok(settings)
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

fn parse_partial_media_policy(s: &str) -> Option<PartialMediaPolicy> {
    PartialMediaPolicy::from_str(s, true).ok()
}
