//! `POST /api/decision` — the one way a human moves a job out of `ready`.

use std::path::Path;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use wts_core::folder_shape;
use wts_store::{JobStatus, Proposal};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub path: String,
    pub action: String,
    pub proposal: Option<Proposal>,
    pub feedback: Option<String>,
    pub user_classification: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub ok: bool,
}

pub async fn decision(
    State(state): State<AppState>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<Json<DecisionResponse>> {
    match body.action.as_str() {
        "accept" => {
            state
                .store
                .accept_proposal(&body.path, body.proposal.as_ref())
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("no job for '{}'", body.path)))?;
        }
        "reconsider" => {
            let target = if body.user_classification.as_deref() == Some("multi_disc_album") {
                Path::new(&body.path)
                    .parent()
                    .map(|p| p.display().to_string())
                    .ok_or_else(|| ApiError::BadRequest("path has no parent folder".to_string()))?
            } else {
                body.path.clone()
            };

            let shape = folder_shape::analyze(Path::new(&target))?;
            let metadata_json = serde_json::to_string(&shape).map_err(wts_store::StoreError::from)?;

            state
                .store
                .requeue_for_reconsideration(&target, Some(&metadata_json), body.feedback.as_deref())
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("no job for '{target}'")))?;
        }
        "skip" => {
            state
                .store
                .update_latest_status_for_folder(&body.path, &[JobStatus::Ready], JobStatus::Skipped)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("no job for '{}'", body.path)))?;
            state.progress.record_skipped();
        }
        other => return Err(ApiError::BadRequest(format!("unknown action '{other}'"))),
    }

    Ok(Json(DecisionResponse { ok: true }))
}
