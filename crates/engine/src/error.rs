/// Errors from the HTTP engine adapter.
///
/// Never surfaced to callers of the job API: the orchestrator records them
/// as the failed job's diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Engine request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The engine returned a non-2xx status code.
    #[error("Engine API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body was not the expected JSON object.
    #[error("Malformed engine response: {0}")]
    MalformedResponse(String),

    /// Reading inputs or writing the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
