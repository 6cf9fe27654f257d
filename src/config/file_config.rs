use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub media_path: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Feature configs
    pub provider: Option<ProviderConfig>,
    pub import: Option<ImportConfig>,
}

/// `[provider]` section: the upstream listing API.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout_sec: Option<u64>,
}

/// `[import]` section: pipeline tuning.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: Option<usize>,
    pub listing_concurrency: Option<usize>,
    pub media_concurrency: Option<usize>,
    pub job_retention_secs: Option<u64>,
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
    /// "drop_listing" or "keep_partial"
    pub partial_media_policy: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
