//! `GET /api/status` — a snapshot of the whole pipeline for a polling front-end.

use axum::{extract::State, Json};
use serde::Serialize;
use wts_store::JobStatus;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReadyEntry {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub source_dir: String,
    pub target_dir: String,
    pub counts: std::collections::HashMap<JobStatus, i64>,
    pub processed: u64,
    pub total: i64,
    pub ready: Vec<ReadyEntry>,
}

pub async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let paths = state.paths.read().await;
    let counts = state.store.counts().await?;
    let total = counts.values().sum();
    let processed = state.progress.get_stats().total_processed;

    let ready_jobs = state.store.recent_jobs(100, Some(&[JobStatus::Ready])).await?;
    let ready = ready_jobs
        .into_iter()
        .map(|job| {
            let name = std::path::Path::new(&job.folder_path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| job.folder_path.clone());
            ReadyEntry { path: job.folder_path, name }
        })
        .collect();

    Ok(Json(StatusResponse {
        source_dir: paths.source_dir.display().to_string(),
        target_dir: paths.target_dir.display().to_string(),
        counts,
        processed,
        total,
        ready,
    }))
}
