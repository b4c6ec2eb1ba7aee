// handlers/admin/members.rs - member listing and creation for the admin panel

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::types::Member;
use crate::validation::MemberPayload;

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<Member>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub ok: bool,
    pub user: Member,
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<UserList> {
    let users = state.directory.list_members().await?;
    Ok(ApiResponse::success(UserList { users }))
}

/// POST /api/createUser - Rejects an email that already exists
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<MemberPayload>, JsonRejection>,
) -> ApiResult<CreatedUser> {
    let Json(payload) = payload?;
    let user = state.directory.create_member(&payload).await?;
    Ok(ApiResponse::created(CreatedUser { ok: true, user }))
}
