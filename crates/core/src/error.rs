use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Job {0} already exists and has not expired")]
    DuplicateJob(JobId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] keyed by any displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = CoreError::not_found("Job", "abc");
        assert_eq!(err.to_string(), "Entity not found: Job with id abc");
    }

    #[test]
    fn display_duplicate_job() {
        let err = CoreError::DuplicateJob("job-1".to_string());
        assert_eq!(
            err.to_string(),
            "Job job-1 already exists and has not expired"
        );
    }
}
