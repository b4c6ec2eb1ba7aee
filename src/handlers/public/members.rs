// handlers/public/members.rs - keyed member access used by the modify form

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::types::{Member, UpsertOutcome};
use crate::validation::ModifyPayload;

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: Member,
}

#[derive(Debug, Serialize)]
pub struct ModifyData {
    pub ok: bool,
    pub outcome: UpsertOutcome,
}

/// GET /api/getUserByKey?key= - Prefill data for the modify form
pub async fn get_user_by_key(
    State(state): State<AppState>,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> ApiResult<UserData> {
    let Query(query) = query?;
    let key = query.key.ok_or_else(|| ApiError::bad_request("key is required"))?;
    let user = state.directory.member_by_key(&key).await?;
    Ok(ApiResponse::success(UserData { user }))
}

/// POST /api/modifyUser - Update or provision the record the key grants access to
pub async fn modify_user(
    State(state): State<AppState>,
    payload: Result<Json<ModifyPayload>, JsonRejection>,
) -> ApiResult<ModifyData> {
    let Json(payload) = payload?;
    let modification = state.directory.modify_member(&payload).await?;
    Ok(ApiResponse::success(ModifyData {
        ok: true,
        outcome: modification.outcome,
    }))
}
