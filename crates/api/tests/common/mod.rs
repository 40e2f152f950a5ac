#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use faceswap_api::config::{ServerConfig, StorageConfig};
use faceswap_api::engine::JobOrchestrator;
use faceswap_api::router::build_app_router;
use faceswap_api::state::AppState;
use faceswap_api::storage::MediaStorage;
use faceswap_api::ws::SubscriptionHub;
use faceswap_core::job::JobRecord;
use faceswap_core::types::new_id;
use faceswap_engine::{RunObserver, RunOutcome, RunRequest, TransformEngine};
use faceswap_store::JobStore;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Build a test `ServerConfig` rooted in `dir`.
pub fn test_config(dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        storage: StorageConfig {
            upload_dir: dir.join("uploads"),
            output_dir: dir.join("outputs"),
            max_upload_size_mb: 1,
            job_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
        },
    }
}

/// A router plus direct handles on its state. Owns the temp directory, so
/// keep it alive for the whole test.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    /// Place a file in the upload directory the way an upload would and
    /// return its upload id.
    pub fn stage_upload(&self, name: &str, bytes: &[u8]) -> String {
        let id = new_id();
        let path = self.state.storage.upload_dir().join(format!("{id}_{name}"));
        std::fs::write(path, bytes).expect("write staged upload");
        id
    }

    /// Poll the store until `job_id` is terminal.
    pub async fn wait_for_terminal(&self, job_id: &str) -> JobRecord {
        wait_for_terminal(&self.state.store, job_id).await
    }
}

/// Build the full application router with all middleware layers around
/// `engine`, using fresh temp directories.
pub async fn build_test_app(engine: Arc<dyn TransformEngine>) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = test_config(dir.path());

    let storage = Arc::new(MediaStorage::new(&config.storage));
    storage.ensure_dirs().await.expect("media dirs");
    let store = Arc::new(JobStore::new(config.storage.job_ttl));
    let hub = Arc::new(SubscriptionHub::new());
    let orchestrator = Arc::new(JobOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&hub),
        engine,
        storage.output_dir(),
        Duration::from_secs(10),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        storage,
        store,
        hub,
        orchestrator,
    };
    let router = build_app_router(state.clone(), &config);

    TestApp { router, state, dir }
}

pub async fn wait_for_terminal(store: &JobStore, job_id: &str) -> JobRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let record = store.get(job_id).expect("job should exist");
        if record.is_terminal() {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} did not finish: {record:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ---------------------------------------------------------------------------
// Fake engine
// ---------------------------------------------------------------------------

/// What [`ScriptedEngine`] does after emitting its lines.
#[derive(Debug, Clone)]
pub enum Ending {
    /// Write the artifact and succeed.
    Succeed,
    /// Fail with the given diagnostic.
    Fail(String),
    /// Never finish on its own; only cancellation ends the run.
    Hang,
}

/// In-process engine with a fixed script of output lines.
pub struct ScriptedEngine {
    pub lines: Vec<String>,
    pub ending: Ending,
    pub healthy: bool,
}

impl ScriptedEngine {
    pub fn succeeding(lines: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ending: Ending::Succeed,
            healthy: true,
        })
    }

    pub fn failing(diagnostic: &str) -> Arc<Self> {
        Arc::new(Self {
            lines: Vec::new(),
            ending: Ending::Fail(diagnostic.to_string()),
            healthy: true,
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            lines: vec!["Processing frame 1".to_string()],
            ending: Ending::Hang,
            healthy: true,
        })
    }

    pub fn unhealthy() -> Arc<Self> {
        Arc::new(Self {
            lines: Vec::new(),
            ending: Ending::Succeed,
            healthy: false,
        })
    }
}

#[async_trait]
impl TransformEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn run(
        &self,
        request: &RunRequest,
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        observer.started();
        for line in &self.lines {
            observer.line(line);
            tokio::task::yield_now().await;
        }
        match &self.ending {
            Ending::Succeed => {
                std::fs::write(&request.output_path, b"swapped video").expect("write artifact");
                RunOutcome::Success {
                    output_path: request.output_path.clone(),
                }
            }
            Ending::Fail(diagnostic) => RunOutcome::Failed {
                diagnostic: diagnostic.clone(),
            },
            Ending::Hang => {
                cancel.cancelled().await;
                RunOutcome::Cancelled
            }
        }
    }

    async fn health(&self) -> bool {
        self.healthy
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Read the full response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    app.oneshot(request).await.expect("oneshot")
}

pub async fn post_json(app: Router, uri: &str, json: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .expect("build request");
    app.oneshot(request).await.expect("oneshot")
}

const BOUNDARY: &str = "faceswap-test-boundary";

/// POST a multipart form with a single file part.
pub async fn post_file(
    app: Router,
    uri: &str,
    field: &str,
    filename: &str,
    bytes: &[u8],
) -> Response<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build request");
    app.oneshot(request).await.expect("oneshot")
}
