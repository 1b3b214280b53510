//! Scanner, classifier, proposal generation, file placement, and worker pool
//! for the whats-that-sound job pipeline.

pub mod classifier;
pub mod collection;
pub mod error;
pub mod file_mover;
pub mod folder_shape;
pub mod paths;
pub mod progress;
pub mod proposal_generator;
pub mod scanner;
pub mod tracker_mark;
pub mod worker_pool;

pub use error::{CoreError, CoreResult, FailureClass};
pub use paths::{PathsState, SharedPaths, StagedPaths};
pub use progress::{ProgressStats, ProgressTracker};
pub use worker_pool::WorkerPool;
