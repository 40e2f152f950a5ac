//! Request handlers for the `/api` routes.
//!
//! Handlers validate input, delegate to storage, the job store, or the
//! orchestrator, and map errors via [`AppError`](crate::error::AppError).

pub mod downloads;
pub mod jobs;
pub mod uploads;
