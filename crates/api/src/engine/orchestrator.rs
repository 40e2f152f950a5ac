//! Job lifecycle driver.
//!
//! [`JobOrchestrator::submit`] creates the record and spawns exactly one
//! tracked task per job. That task drives the engine run and is the only
//! writer of the job's record, so updates for one job are applied (and
//! published) in order: progress first, terminal state last.
//!
//! An identifier stays claimed in the active-run set until its task ends, so
//! no second run can start under it even if the record is gone.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use faceswap_core::error::CoreError;
use faceswap_core::job::{JobRecord, JobStatus};
use faceswap_core::naming;
use faceswap_core::options::EngineOptions;
use faceswap_core::progress::ProgressEstimator;
use faceswap_core::types::JobId;
use faceswap_engine::{RunObserver, RunOutcome, RunRequest, TransformEngine};
use faceswap_store::JobStore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::ws::SubscriptionHub;

/// A validated request to start a job.
#[derive(Debug, Clone)]
pub struct SubmitJob {
    pub job_id: JobId,
    /// Source face image.
    pub source_path: PathBuf,
    /// Target video.
    pub target_path: PathBuf,
    pub options: EngineOptions,
    /// Deliver this job's updates only to this client instead of
    /// broadcasting them.
    pub client_id: Option<String>,
}

pub struct JobOrchestrator {
    store: Arc<JobStore>,
    hub: Arc<SubscriptionHub>,
    engine: Arc<dyn TransformEngine>,
    output_dir: PathBuf,
    deadline: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
    active: Arc<DashMap<JobId, ()>>,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        hub: Arc<SubscriptionHub>,
        engine: Arc<dyn TransformEngine>,
        output_dir: impl Into<PathBuf>,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            hub,
            engine,
            output_dir: output_dir.into(),
            deadline,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            active: Arc::new(DashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn TransformEngine> {
        &self.engine
    }

    /// Create a `pending` job and start its run.
    ///
    /// Fails with `NotFound` when an input file is missing and with
    /// `DuplicateJob` when the identifier is still held by an unexpired job
    /// or by a run that has not finished.
    /// Run failures are never returned here; they land in the record.
    pub async fn submit(&self, job: SubmitJob) -> Result<JobId, CoreError> {
        if !path_exists(&job.source_path).await {
            return Err(CoreError::not_found("Source image", job.source_path.display()));
        }
        if !path_exists(&job.target_path).await {
            return Err(CoreError::not_found("Target video", job.target_path.display()));
        }
        if self.cancel.is_cancelled() {
            return Err(CoreError::Internal(
                "Service is shutting down; no new jobs are accepted".to_string(),
            ));
        }

        let claim = ActiveRun::claim(&self.active, &job.job_id)?;
        let record = self.store.create(&job.job_id, JobStatus::Pending)?;
        let notifier = Notifier {
            hub: Arc::clone(&self.hub),
            client_id: job.client_id,
        };
        notifier.publish(&record);

        let request = RunRequest {
            source_path: job.source_path,
            target_path: job.target_path,
            output_path: self.output_dir.join(naming::output_filename(&job.job_id)),
            options: job.options,
            deadline: self.deadline,
        };
        let observer = JobObserver {
            job_id: job.job_id.clone(),
            store: Arc::clone(&self.store),
            notifier,
            estimator: ProgressEstimator::new(),
        };

        tracing::info!(
            job_id = %job.job_id,
            engine = self.engine.name(),
            deadline_secs = self.deadline.as_secs(),
            "Job submitted"
        );

        let engine = Arc::clone(&self.engine);
        let cancel = self.cancel.clone();
        self.tracker.spawn(run_job(engine, request, observer, cancel, claim));

        Ok(job.job_id)
    }

    /// Number of runs still in flight.
    pub fn active_runs(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every in-flight run and wait up to `grace` for them to settle.
    ///
    /// Cancelled jobs are failed with a cancellation diagnostic. Returns
    /// `false` if some runs were still going when `grace` ran out.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let active = self.tracker.len();
        tracing::info!(active, "Cancelling in-flight runs");
        self.cancel.cancel();
        self.tracker.close();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracker.len(),
                    "Runs still active after shutdown grace period"
                );
                false
            }
        }
    }
}

async fn path_exists(path: &std::path::Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Body of a job's task: one engine run, then the terminal update.
async fn run_job(
    engine: Arc<dyn TransformEngine>,
    request: RunRequest,
    mut observer: JobObserver,
    cancel: CancellationToken,
    _claim: ActiveRun,
) {
    let outcome = engine.run(&request, &mut observer, &cancel).await;
    observer.finish(outcome);
}

/// Claim on a job identifier in the active-run set, released on drop.
struct ActiveRun {
    active: Arc<DashMap<JobId, ()>>,
    job_id: JobId,
}

impl ActiveRun {
    fn claim(active: &Arc<DashMap<JobId, ()>>, job_id: &str) -> Result<Self, CoreError> {
        match active.entry(job_id.to_string()) {
            Entry::Occupied(_) => Err(CoreError::DuplicateJob(job_id.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(Self {
                    active: Arc::clone(active),
                    job_id: job_id.to_string(),
                })
            }
        }
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active.remove(&self.job_id);
    }
}

/// Pushes job snapshots to the hub.
struct Notifier {
    hub: Arc<SubscriptionHub>,
    client_id: Option<String>,
}

impl Notifier {
    fn publish(&self, record: &JobRecord) {
        let text = match serde_json::to_string(record) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    job_id = %record.job_id,
                    error = %e,
                    "Failed to serialize job snapshot"
                );
                return;
            }
        };
        let message = Message::Text(text.into());
        let delivered = match &self.client_id {
            Some(client_id) => self.hub.send_to(client_id, message),
            None => self.hub.broadcast(message),
        };
        tracing::trace!(
            job_id = %record.job_id,
            status = %record.status,
            progress = record.progress,
            delivered,
            "Job update published"
        );
    }
}

/// Translates engine callbacks into record updates for one job.
struct JobObserver {
    job_id: JobId,
    store: Arc<JobStore>,
    notifier: Notifier,
    estimator: ProgressEstimator,
}

impl JobObserver {
    /// Apply `mutate` and publish the result if it changed anything.
    fn apply<F>(&self, mutate: F)
    where
        F: FnOnce(&mut JobRecord) -> bool,
    {
        match self.store.update(&self.job_id, mutate) {
            Ok(Some(snapshot)) => self.notifier.publish(&snapshot),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, error = %e, "Job update dropped");
            }
        }
    }

    fn finish(self, outcome: RunOutcome) {
        match &outcome {
            RunOutcome::Success { output_path } => {
                let filename = output_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| naming::output_filename(&self.job_id));
                let reference = naming::download_reference(&filename);
                tracing::info!(job_id = %self.job_id, output_url = %reference, "Job completed");
                self.apply(|record| record.complete(reference));
            }
            failure => {
                let diagnostic = failure
                    .diagnostic()
                    .unwrap_or_else(|| "unknown error".to_string());
                tracing::warn!(job_id = %self.job_id, error = %diagnostic, "Job failed");
                self.apply(|record| record.fail(diagnostic));
            }
        }
    }
}

impl RunObserver for JobObserver {
    fn started(&mut self) {
        let progress = self.estimator.start();
        self.apply(|record| record.start(progress));
    }

    fn line(&mut self, line: &str) {
        tracing::debug!(job_id = %self.job_id, line = %line, "engine output");
        if let Some(progress) = self.estimator.observe(line) {
            self.apply(|record| record.advance(progress));
        }
    }
}
