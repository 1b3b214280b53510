//! Error types for the oracle client

use thiserror::Error;

/// Errors that can occur when consulting the text-generation oracle
#[derive(Error, Debug)]
pub enum OracleError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The provider returned a well-formed error response
    #[error("oracle API error: {message}")]
    ApiError { status: u16, message: String },

    /// Model not found or not pulled by the backend
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Request timeout
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Response did not match the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Connection refused (backend not running)
    #[error("connection refused; is the oracle backend running at {0}?")]
    ConnectionRefused(String),

    /// Required credential missing or empty at construction time
    #[error("missing credential for provider: {0}")]
    MissingCredential(String),

    /// All retry attempts exhausted
    #[error("all {attempts} retry attempts failed; last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl OracleError {
    /// Check if this error is retryable (transient)
    ///
    /// Retries on timeouts, connection refused, transport-level connect/timeout
    /// errors, server errors (5xx), and rate limiting (429). Does not retry on
    /// other 4xx client errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::ConnectionRefused(_) => true,
            Self::HttpError(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.is_server_error() || status.as_u16() == 429)
            }
            Self::ApiError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for oracle operations
pub type OracleResult<T> = Result<T, OracleError>;
