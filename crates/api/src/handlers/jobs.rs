//! Handlers for job submission and status queries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use faceswap_core::error::CoreError;
use faceswap_core::job::JobRecord;
use faceswap_core::options::EngineOptions;
use faceswap_core::types::{new_id, JobId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::SubmitJob;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/process`.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// Upload id of the source face image.
    pub image_id: String,
    /// Upload id of the target video.
    pub video_id: String,
    /// Send this job's updates only to the WebSocket client with this id.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Engine option overrides, merged over the defaults.
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub job_id: JobId,
}

/// POST /api/process
///
/// Resolves both uploads and starts a job. Returns `201` with the job id as
/// soon as the job is `pending`; progress arrives over the live channel.
pub async fn process(
    State(state): State<AppState>,
    Json(input): Json<ProcessRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ProcessResponse>>)> {
    let source_path = state
        .storage
        .resolve_upload(&input.image_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Source image", &input.image_id))?;
    let target_path = state
        .storage
        .resolve_upload(&input.video_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Target video", &input.video_id))?;

    let options = match input.options {
        Some(overrides) => EngineOptions::with_overrides(overrides),
        None => EngineOptions::default(),
    };

    let job_id = state
        .orchestrator
        .submit(SubmitJob {
            job_id: new_id(),
            source_path,
            target_path,
            options,
            client_id: input.client_id.filter(|id| !id.trim().is_empty()),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ProcessResponse { job_id },
        }),
    ))
}

/// GET /api/job/{job_id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<JobRecord>>> {
    let record = state
        .store
        .get(&job_id)
        .ok_or_else(|| CoreError::not_found("Job", &job_id))?;
    Ok(Json(DataResponse { data: record }))
}

/// GET /api/jobs
///
/// All unexpired jobs, oldest first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<DataResponse<Vec<JobRecord>>> {
    Json(DataResponse {
        data: state.store.list(),
    })
}
