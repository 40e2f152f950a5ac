//! Route definitions for uploads and artifact downloads.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{downloads, uploads};
use crate::state::AppState;

/// Routes mounted at `/api`.
///
/// ```text
/// POST   /upload/image           -> upload_image
/// POST   /upload/video           -> upload_video
/// GET    /download/{filename}    -> download
/// ```
///
/// The default body limit is lifted on uploads; storage enforces the
/// configured ceiling while streaming.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload/image", post(uploads::upload_image))
        .route("/upload/video", post(uploads::upload_video))
        .layer(DefaultBodyLimit::disable())
        .route("/download/{filename}", get(downloads::download))
}
