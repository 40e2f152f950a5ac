//! Route definitions for job submission and queries.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/api`.
///
/// ```text
/// POST   /process         -> process
/// GET    /job/{job_id}    -> get_job
/// GET    /jobs            -> list_jobs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(jobs::process))
        .route("/job/{job_id}", get(jobs::get_job))
        .route("/jobs", get(jobs::list_jobs))
}
