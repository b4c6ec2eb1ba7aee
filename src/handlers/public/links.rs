// handlers/public/links.rs - POST /api/getModLink

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::ModLink;

#[derive(Debug, Deserialize)]
pub struct ModLinkRequest {
    pub email: Option<String>,
}

/// POST /api/getModLink - Derive the key for an email and return the modify link
pub async fn get_mod_link(
    State(state): State<AppState>,
    payload: Result<Json<ModLinkRequest>, JsonRejection>,
) -> ApiResult<ModLink> {
    let Json(request) = payload?;
    let email = request
        .email
        .ok_or_else(|| ApiError::bad_request("email is required"))?;

    let link = state.directory.mod_link(&email)?;
    Ok(ApiResponse::success(link))
}
