//! `GET`/`POST /api/paths` — read, stage, cancel, or confirm the source and
//! target roots.

use std::path::PathBuf;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PathsResponse {
    pub source_dir: String,
    pub target_dir: String,
    pub staged: Option<StagedResponse>,
}

#[derive(Debug, Serialize)]
pub struct StagedResponse {
    pub source_dir: String,
    pub target_dir: String,
}

pub async fn get_paths(State(state): State<AppState>) -> Json<PathsResponse> {
    let paths = state.paths.read().await;
    Json(PathsResponse {
        source_dir: paths.source_dir.display().to_string(),
        target_dir: paths.target_dir.display().to_string(),
        staged: paths.staged.as_ref().map(|s| StagedResponse {
            source_dir: s.source_dir.display().to_string(),
            target_dir: s.target_dir.display().to_string(),
        }),
    })
}

#[derive(Debug, Deserialize)]
pub struct PathsRequest {
    pub action: String,
    pub source_dir: Option<String>,
    pub target_dir: Option<String>,
}

pub async fn post_paths(
    State(state): State<AppState>,
    Json(body): Json<PathsRequest>,
) -> ApiResult<Json<PathsResponse>> {
    let mut paths = state.paths.write().await;

    match body.action.as_str() {
        "stage" => {
            let source = body
                .source_dir
                .ok_or_else(|| ApiError::BadRequest("stage requires source_dir".to_string()))?;
            let target = body
                .target_dir
                .ok_or_else(|| ApiError::BadRequest("stage requires target_dir".to_string()))?;
            paths.stage(PathBuf::from(source), PathBuf::from(target))?;
        }
        "cancel" => paths.cancel_staged(),
        "confirm" => paths.confirm_staged()?,
        other => return Err(ApiError::BadRequest(format!("unknown action '{other}'"))),
    }

    Ok(Json(PathsResponse {
        source_dir: paths.source_dir.display().to_string(),
        target_dir: paths.target_dir.display().to_string(),
        staged: paths.staged.as_ref().map(|s| StagedResponse {
            source_dir: s.source_dir.display().to_string(),
            target_dir: s.target_dir.display().to_string(),
        }),
    }))
}
