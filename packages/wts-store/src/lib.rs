//! The durable job queue shared by the scanner, worker pool, and control
//! plane. `JobStore` is the system's synchronization point: every other
//! component holds only process-local state.

mod error;
mod migrations;
mod model;
mod store;

pub use error::{StoreError, StoreResult};
pub use model::{Job, JobStatus, JobType, Proposal, ReleaseType};
pub use store::JobStore;
