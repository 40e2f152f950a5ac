use std::sync::Arc;

use faceswap_store::JobStore;

use crate::config::ServerConfig;
use crate::engine::JobOrchestrator;
use crate::storage::MediaStorage;
use crate::ws::SubscriptionHub;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Upload and output directories.
    pub storage: Arc<MediaStorage>,
    /// In-memory job table.
    pub store: Arc<JobStore>,
    /// WebSocket subscription registry.
    pub hub: Arc<SubscriptionHub>,
    /// Starts and tracks engine runs.
    pub orchestrator: Arc<JobOrchestrator>,
}
