//! Job record and its lifecycle state machine.
//!
//! ```text
//! pending ──> processing ──> completed
//!    │             │
//!    └─────────────┴───────> failed
//! ```
//!
//! `completed` and `failed` are terminal. Every transition method returns
//! `true` when it changed the record and `false` when it was ignored, so a
//! late progress event arriving after a terminal state has no effect.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::progress::PROGRESS_COMPLETE;
use crate::types::{JobId, Timestamp};

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, run not yet confirmed started.
    Pending,
    /// The engine run is streaming output.
    Processing,
    /// The engine produced the output artifact.
    Completed,
    /// The run failed, timed out, or was cancelled.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one job's state.
///
/// Serialized as-is onto the live update channel and the job query routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Approximate completion, 0-100. Only reaches 100 on success.
    pub progress: u8,
    /// Download locator for the finished artifact (terminal success only).
    #[serde(rename = "output_url")]
    pub output_reference: Option<String>,
    /// Diagnostic text (terminal failure only).
    #[serde(rename = "error")]
    pub error_detail: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobRecord {
    /// A fresh record with zero progress.
    pub fn new(job_id: impl Into<JobId>, status: JobStatus) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status,
            progress: 0,
            output_reference: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `pending -> processing`, raising progress to at least `progress`.
    pub fn start(&mut self, progress: u8) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Processing;
        self.progress = self.progress.max(progress.min(PROGRESS_COMPLETE - 1));
        self.touch();
        true
    }

    /// Raise progress on a non-terminal job. Never lowers it and never
    /// reaches 100, which is reserved for [`JobRecord::complete`].
    pub fn advance(&mut self, progress: u8) -> bool {
        let progress = progress.min(PROGRESS_COMPLETE - 1);
        if self.is_terminal() || progress <= self.progress {
            return false;
        }
        self.progress = progress;
        self.touch();
        true
    }

    /// Terminal success: progress forced to 100 and the artifact recorded.
    pub fn complete(&mut self, output_reference: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = PROGRESS_COMPLETE;
        self.output_reference = Some(output_reference.into());
        self.error_detail = None;
        self.touch();
        true
    }

    /// Terminal failure. Progress keeps its last value.
    pub fn fail(&mut self, detail: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let detail = detail.into();
        self.status = JobStatus::Failed;
        self.output_reference = None;
        self.error_detail = Some(if detail.trim().is_empty() {
            "unknown error".to_string()
        } else {
            detail
        });
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
