//! Control-plane HTTP API: exposes pipeline state and accepts human
//! decisions over JSON and one server-sent-events stream.

pub mod error;
pub mod router;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use router::build_router;
pub use state::AppState;
