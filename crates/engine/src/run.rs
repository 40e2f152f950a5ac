//! Engine-agnostic run interface and shared types.
//!
//! Defines [`TransformEngine`], the trait both engine adapters implement,
//! along with [`RunRequest`], [`RunObserver`], and [`RunOutcome`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use faceswap_core::options::EngineOptions;
use tokio_util::sync::CancellationToken;

/// Everything one supervised run needs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Source face image.
    pub source_path: PathBuf,
    /// Target video.
    pub target_path: PathBuf,
    /// Where the engine must write the artifact.
    pub output_path: PathBuf,
    /// Opaque option bag forwarded to the engine.
    pub options: EngineOptions,
    /// Maximum wall-clock time before the run is terminated.
    pub deadline: Duration,
}

/// Callbacks invoked while a run is in flight, in order, from the task that
/// drives the run.
pub trait RunObserver: Send {
    /// The engine accepted the work (process spawned / request sent).
    fn started(&mut self);

    /// One line of engine output, as it arrives.
    fn line(&mut self, line: &str);
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine finished and the artifact exists.
    Success {
        /// Path of the produced artifact.
        output_path: PathBuf,
    },
    /// Nonzero exit, missing artifact, launch error, or malformed response.
    Failed {
        /// Captured error text, never empty.
        diagnostic: String,
    },
    /// The deadline elapsed and the run was terminated.
    TimedOut {
        /// Time spent before termination.
        elapsed: Duration,
    },
    /// The run was terminated by a cancellation request (shutdown).
    Cancelled,
}

impl RunOutcome {
    /// Human-readable diagnostic for every non-success outcome.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::Failed { diagnostic } => Some(diagnostic.clone()),
            Self::TimedOut { elapsed } => Some(format!(
                "Timed out: engine exceeded its deadline and was terminated after {}s",
                elapsed.as_secs()
            )),
            Self::Cancelled => Some("Cancelled: run terminated before completion".to_string()),
        }
    }
}

/// An external media-transformation engine.
///
/// Implementations must never leave a child process or in-flight request
/// behind when `run` returns, whatever the outcome.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    /// Short adapter name for logs.
    fn name(&self) -> &'static str;

    /// Execute one run, reporting progress through `observer`.
    async fn run(
        &self,
        request: &RunRequest,
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> RunOutcome;

    /// Whether the engine is reachable. Engines without a probe report `true`.
    async fn health(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
