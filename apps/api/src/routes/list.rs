//! `GET /api/list?path=…` — directory browsing for front-end source/target pickers.

use std::path::Path;

use axum::extract::Query;
use axum::Json;
use serde::{Deserialize, Serialize};
use wts_core::paths::{self, DirEntryInfo};

use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub entries: Vec<DirEntryInfo>,
    pub parent: Option<String>,
}

pub async fn list(Query(query): Query<ListQuery>) -> ApiResult<Json<ListResponse>> {
    let (entries, parent) = paths::list_directory(Path::new(&query.path))?;
    Ok(Json(ListResponse { entries, parent }))
}
