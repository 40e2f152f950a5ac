use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use faceswap_api::config::ServerConfig;
use faceswap_api::engine::JobOrchestrator;
use faceswap_api::router::build_app_router;
use faceswap_api::state::AppState;
use faceswap_api::storage::MediaStorage;
use faceswap_api::{background, ws};
use faceswap_engine::EngineConfig;
use faceswap_store::JobStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "faceswap_api=debug,faceswap_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let engine_config = EngineConfig::from_env();
    tracing::info!(
        mode = ?engine_config.mode,
        timeout_secs = engine_config.timeout.as_secs(),
        "Loaded engine configuration"
    );

    // --- Storage ---
    let storage = Arc::new(MediaStorage::new(&config.storage));
    storage
        .ensure_dirs()
        .await
        .expect("Failed to create upload/output directories");
    tracing::info!(
        upload_dir = %storage.upload_dir().display(),
        output_dir = %storage.output_dir().display(),
        "Media directories ready"
    );

    // --- Job store + expiry sweeper ---
    let store = Arc::new(JobStore::new(config.storage.job_ttl));
    let sweeper_cancel = CancellationToken::new();
    let sweeper_handle = tokio::spawn(background::job_expiry::run(
        Arc::clone(&store),
        config.storage.sweep_interval,
        sweeper_cancel.clone(),
    ));

    // --- WebSocket hub + heartbeat ---
    let hub = Arc::new(ws::SubscriptionHub::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&hub));

    // --- Engine + orchestrator ---
    let engine = engine_config.build();
    tracing::info!(engine = engine.name(), "Engine adapter ready");
    let orchestrator = Arc::new(JobOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&hub),
        engine,
        storage.output_dir(),
        engine_config.timeout,
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        storage,
        store,
        hub: Arc::clone(&hub),
        orchestrator: Arc::clone(&orchestrator),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Cancel runs first: children are killed and their jobs failed, which
    // still publishes to any subscriber that is connected.
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if orchestrator.shutdown(grace).await {
        tracing::info!("All engine runs settled");
    }

    sweeper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;
    tracing::info!("Job expiry sweeper stopped");

    let ws_count = hub.connection_count();
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    hub.shutdown_all();

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
