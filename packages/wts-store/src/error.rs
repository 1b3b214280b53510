//! Error types for the job store

use thiserror::Error;

/// Errors the job store can raise. Both variants are fatal to the caller's
/// current job per the error-handling design: `StoreUnavailable` should end
/// the process, `InvalidTransition` should surface as an HTTP 400.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database is missing, corrupted, or otherwise unreachable
    #[error("job store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// The requested status change is not a legal transition from the job's
    /// current status
    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: i64,
        from: String,
        to: String,
    },

    /// No job row matches the given id or folder path
    #[error("job not found: {0}")]
    NotFound(String),

    /// `result_json`/`metadata_json` failed to serialize or deserialize
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
