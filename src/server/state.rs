use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;
use crate::import_jobs::ImportService;

pub type GuardedImportService = Arc<ImportService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub import_service: GuardedImportService,
}

impl ServerState {
    pub fn new(config: ServerConfig, import_service: GuardedImportService) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            import_service,
        }
    }
}

impl FromRef<ServerState> for GuardedImportService {
    fn from_ref(input: &ServerState) -> Self {
        input.import_service.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
