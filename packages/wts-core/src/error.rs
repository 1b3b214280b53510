//! Error types for the scanning/classification/move pipeline.

use thiserror::Error;
use wts_oracle::OracleError;
use wts_store::StoreError;

/// Errors raised while processing a single job. Every variant maps to one of
/// the two worker-facing failure classes: transient (the job is retried by
/// re-queueing or by a human) or permanent (the input itself is unusable and
/// is skipped rather than retried).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("job store error: {0}")]
    Store(#[from] StoreError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read tags from '{path}': {reason}")]
    TagRead { path: String, reason: String },

    #[error("oracle response was not a well-formed proposal: {0}")]
    ProposalParse(String),

    #[error("folder is unreadable or missing: {0}")]
    InvalidFolder(String),
}

/// The taxonomy from the error-handling design: a transient failure ends the
/// job in `error` but the input folder might succeed on a later attempt; a
/// permanent one means the scanner should silently skip the subtree instead
/// of ever enqueueing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Permanent,
}

impl CoreError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Store(_) | Self::Oracle(_) | Self::ProposalParse(_) => FailureClass::Transient,
            Self::Io(_) | Self::TagRead { .. } | Self::InvalidFolder(_) => FailureClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == FailureClass::Transient
    }

    /// Log at a severity matching the taxonomy: store failures are fatal to
    /// the process elsewhere, so here they are logged as errors; per-job
    /// failures that the pool absorbs and continues past are warnings.
    pub fn log(&self) {
        match self.class() {
            FailureClass::Transient => tracing::warn!(error = %self, "transient worker failure"),
            FailureClass::Permanent => tracing::warn!(error = %self, "permanent input failure, skipping"),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
