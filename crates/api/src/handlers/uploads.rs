//! Handlers for media uploads.
//!
//! Each endpoint accepts a multipart form with a required `file` field and
//! streams it to the upload directory under a fresh upload id.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use faceswap_core::naming::MediaKind;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::StoredUpload;

/// POST /api/upload/image
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<StoredUpload>>)> {
    receive_upload(&state, MediaKind::Image, multipart).await
}

/// POST /api/upload/video
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<StoredUpload>>)> {
    receive_upload(&state, MediaKind::Video, multipart).await
}

async fn receive_upload(
    state: &AppState,
    kind: MediaKind,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<StoredUpload>>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue; // ignore unknown fields
        }
        let original_name = field.file_name().unwrap_or("").to_string();
        let stored = state
            .storage
            .save_upload(kind, &original_name, field)
            .await?;
        return Ok((StatusCode::CREATED, Json(DataResponse { data: stored })));
    }

    Err(AppError::BadRequest(
        "Missing required 'file' field".to_string(),
    ))
}
