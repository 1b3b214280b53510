//! `GET /api/ready?limit=N` — jobs awaiting a human decision, newest first.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use wts_store::{Job, JobStatus};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReadyQuery {
    limit: Option<i64>,
}

pub async fn ready(State(state): State<AppState>, Query(query): Query<ReadyQuery>) -> ApiResult<Json<Vec<Job>>> {
    let limit = query.limit.unwrap_or(50);
    let jobs = state.store.recent_jobs(limit, Some(&[JobStatus::Ready])).await?;
    Ok(Json(jobs))
}
