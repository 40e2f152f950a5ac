/// Jobs are keyed by an opaque string identifier (a v4 UUID when generated
/// by the service).
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh identifier for a job or an upload.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
