pub mod health;
pub mod jobs;
pub mod media;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// ```text
/// /upload/image                 image upload (POST)
/// /upload/video                 video upload (POST)
/// /process                      start a job (POST)
/// /job/{job_id}                 job snapshot (GET)
/// /jobs                         all unexpired jobs (GET)
/// /download/{filename}          finished artifact (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(media::router()).merge(jobs::router())
}

/// WebSocket live channel, mounted at the root.
///
/// ```text
/// /ws                           anonymous subscription (broadcasts only)
/// /ws/{client_id}               addressable subscription
/// ```
pub fn ws_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/ws/{client_id}", get(ws::ws_client_handler))
}
