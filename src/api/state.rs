use std::sync::Arc;

use crate::config::ServerConfig;
use crate::snapshot::SnapshotService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SnapshotService>,
    pub server: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(service: SnapshotService, server: ServerConfig) -> Self {
        Self {
            service: Arc::new(service),
            server: Arc::new(server),
        }
    }
}
