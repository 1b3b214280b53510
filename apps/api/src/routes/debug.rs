//! `GET /api/debug/jobs?limit=&statuses=a,b` — operator-facing job inspection,
//! the only surface that exposes arbitrary status filters including `error`.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use wts_store::{Job, JobStatus};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DebugJobsQuery {
    limit: Option<i64>,
    statuses: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DebugJobsResponse {
    pub counts: std::collections::HashMap<JobStatus, i64>,
    pub jobs: Vec<Job>,
}

pub async fn jobs(State(state): State<AppState>, Query(query): Query<DebugJobsQuery>) -> ApiResult<Json<DebugJobsResponse>> {
    let limit = query.limit.unwrap_or(100);
    let statuses: Option<Vec<JobStatus>> = query
        .statuses
        .as_deref()
        .map(|raw| raw.split(',').filter_map(JobStatus::parse).collect());

    let counts = state.store.counts().await?;
    let jobs = state.store.recent_jobs(limit, statuses.as_deref()).await?;

    Ok(Json(DebugJobsResponse { counts, jobs }))
}
