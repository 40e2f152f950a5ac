//! Remote engine adapter.
//!
//! Sends both inputs to `POST {base_url}/api/process` as multipart parts,
//! expects a JSON object back, and downloads the artifact named by its
//! `output_url` to the request's output path.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use faceswap_core::options::{value_to_text, EngineOptions};
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::run::{RunObserver, RunOutcome, RunRequest, TransformEngine};

/// Timeout for the health probe. Runs themselves use the request deadline.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a remote engine service.
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEngine {
    /// * `base_url` - e.g. `http://facefusion:7860`. A trailing `/` is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit the inputs and fetch the artifact. Phase changes are reported
    /// to `observer` as activity lines.
    async fn process(
        &self,
        request: &RunRequest,
        observer: &mut dyn RunObserver,
    ) -> Result<(), EngineError> {
        let form = build_form(request).await?;

        observer.started();
        observer.line("Processing: inputs submitted to engine");

        let response = self
            .client
            .post(format!("{}/api/process", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: Value = response.json().await?;
        let Value::Object(body) = body else {
            return Err(EngineError::MalformedResponse(format!(
                "expected a JSON object, got: {body}"
            )));
        };

        if let Some(output_url) = body.get("output_url").and_then(Value::as_str) {
            observer.line("Processing: downloading result");
            self.download(output_url, &request.output_path).await?;
        }
        Ok(())
    }

    /// Stream `output_url` into `dest`.
    async fn download(&self, output_url: &str, dest: &Path) -> Result<(), EngineError> {
        let url = self.resolve_url(output_url);
        tracing::debug!(url = %url, dest = %dest.display(), "Downloading engine artifact");

        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Absolute URLs pass through; anything else is joined to the base URL.
    fn resolve_url(&self, output_url: &str) -> String {
        if output_url.starts_with("http://") || output_url.starts_with("https://") {
            output_url.to_string()
        } else {
            format!("{}/{}", self.base_url, output_url.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl TransformEngine for HttpEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn run(
        &self,
        request: &RunRequest,
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let start = Instant::now();

        let finished = tokio::select! {
            result = tokio::time::timeout(request.deadline, self.process(request, observer)) => Some(result),
            () = cancel.cancelled() => None,
        };

        let outcome = match finished {
            Some(Ok(Ok(()))) => {
                if tokio::fs::try_exists(&request.output_path)
                    .await
                    .unwrap_or(false)
                {
                    return RunOutcome::Success {
                        output_path: request.output_path.clone(),
                    };
                }
                RunOutcome::Failed {
                    diagnostic: format!(
                        "Engine reported success but produced no output at {}",
                        request.output_path.display()
                    ),
                }
            }
            Some(Ok(Err(e))) => {
                tracing::error!(error = %e, engine_url = %self.base_url, "Engine request failed");
                RunOutcome::Failed {
                    diagnostic: e.to_string(),
                }
            }
            Some(Err(_elapsed)) => {
                let elapsed = start.elapsed();
                tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Engine request exceeded its deadline, aborted"
                );
                RunOutcome::TimedOut { elapsed }
            }
            None => {
                tracing::info!("Engine request cancelled");
                RunOutcome::Cancelled
            }
        };

        // A partial download must not be served as an artifact.
        let _ = tokio::fs::remove_file(&request.output_path).await;
        outcome
    }

    async fn health(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Engine health probe failed");
                false
            }
        }
    }
}

/// Multipart body: `source` and `target` file parts plus one text field per
/// option (arrays repeat the field name).
async fn build_form(request: &RunRequest) -> Result<Form, EngineError> {
    let mut form = Form::new()
        .part("source", file_part(&request.source_path).await?)
        .part("target", file_part(&request.target_path).await?);
    form = option_fields(form, &request.options);
    Ok(form)
}

async fn file_part(path: &Path) -> Result<Part, EngineError> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::stream_with_length(file, length).file_name(file_name))
}

fn option_fields(mut form: Form, options: &EngineOptions) -> Form {
    for (key, value) in options.iter() {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    form = form.text(key.clone(), value_to_text(item));
                }
            }
            other => form = form.text(key.clone(), value_to_text(other)),
        }
    }
    form
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or an [`EngineError::Api`] with the body text.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EngineError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(EngineError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
