// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Processing error: {0}")]
    Processing(#[from] crate::port::ProcessingError),

    #[error("Submission failed for job {job_id}: {reason}")]
    SubmissionFailed { job_id: String, reason: String },

    #[error("Task {task_id} for job {job_id} is unreadable: {reason}")]
    UnreadableTask {
        task_id: String,
        job_id: String,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the error reports a rejected (non-monotonic or raced) state change
    pub fn is_transition_rejected(&self) -> bool {
        matches!(
            self,
            AppError::Conflict(_)
                | AppError::InvalidState(_)
                | AppError::Domain(crate::domain::DomainError::InvalidStateTransition { .. })
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
