//! Session-scoped, in-memory progress counters. Never persisted: a restart
//! starts a fresh session with everything back at zero.

use std::sync::Mutex;

use serde::Serialize;
use wts_store::Proposal;

#[derive(Debug, Default)]
struct ProgressInner {
    total_processed: u64,
    successful: u64,
    skipped: u64,
    errors: u64,
    accepted: Vec<Proposal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStats {
    pub total_processed: u64,
    pub successful: u64,
    pub skipped: u64,
    pub errors: u64,
    pub accepted: Vec<Proposal>,
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    inner: Mutex<ProgressInner>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A folder was moved and its TrackerMark written.
    pub fn record_success(&self, proposal: Proposal) {
        let mut inner = self.inner.lock().expect("progress tracker lock poisoned");
        inner.successful += 1;
        inner.total_processed += 1;
        inner.accepted.push(proposal);
    }

    /// A ready job was explicitly skipped by the human reviewer.
    pub fn record_skipped(&self) {
        let mut inner = self.inner.lock().expect("progress tracker lock poisoned");
        inner.skipped += 1;
        inner.total_processed += 1;
    }

    /// A job (scan, analyze, or move) ended in `error`.
    pub fn record_error(&self) {
        let mut inner = self.inner.lock().expect("progress tracker lock poisoned");
        inner.errors += 1;
        inner.total_processed += 1;
    }

    pub fn get_stats(&self) -> ProgressStats {
        let inner = self.inner.lock().expect("progress tracker lock poisoned");
        ProgressStats {
            total_processed: inner.total_processed,
            successful: inner.successful,
            skipped: inner.skipped,
            errors: inner.errors,
            accepted: inner.accepted.clone(),
        }
    }
}
