//! `GET /api/folder?path=…` — fresh folder metadata plus the stored proposal.

use std::path::Path;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use wts_core::folder_shape::{self, FolderShape};
use wts_store::Proposal;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct FolderResponse {
    pub metadata: FolderShape,
    pub proposal: Proposal,
}

pub async fn folder(State(state): State<AppState>, Query(query): Query<FolderQuery>) -> ApiResult<Json<FolderResponse>> {
    let proposal = state
        .store
        .get_result(&query.path)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no ready proposal for '{}'", query.path)))?;

    let metadata = folder_shape::analyze(Path::new(&query.path))?;

    Ok(Json(FolderResponse { metadata, proposal }))
}
