// handlers/admin/groups.rs - group management

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::types::Group;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameGroupRequest {
    pub old_name: Option<String>,
    pub new_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupList {
    pub groups: Vec<Group>,
}

#[derive(Debug, Serialize)]
pub struct CreatedGroup {
    pub ok: bool,
    pub group: Group,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedGroup {
    pub ok: bool,
    pub members_updated: usize,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub ok: bool,
}

/// GET /api/groups
pub async fn list(State(state): State<AppState>) -> ApiResult<GroupList> {
    let groups = state.directory.list_groups().await?;
    Ok(ApiResponse::success(GroupList { groups }))
}

/// POST /api/groups
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> ApiResult<CreatedGroup> {
    let Json(request) = payload?;
    let name = request.name.ok_or_else(|| ApiError::bad_request("name is required"))?;
    let group = state.directory.create_group(&name).await?;
    Ok(ApiResponse::created(CreatedGroup { ok: true, group }))
}

/// POST /api/groups/rename - Renames the group and every member reference to it
pub async fn rename(
    State(state): State<AppState>,
    payload: Result<Json<RenameGroupRequest>, JsonRejection>,
) -> ApiResult<RenamedGroup> {
    let Json(request) = payload?;
    let (Some(old_name), Some(new_name)) = (request.old_name, request.new_name) else {
        return Err(ApiError::bad_request("oldName and newName are required"));
    };
    let members_updated = state.directory.rename_group(&old_name, &new_name).await?;
    Ok(ApiResponse::success(RenamedGroup { ok: true, members_updated }))
}

/// DELETE /api/groups/:name - Refused while any member still references the group
pub async fn delete(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
) -> ApiResult<Deleted> {
    let Path(name) = name?;
    state.directory.delete_group(&name).await?;
    Ok(ApiResponse::success(Deleted { ok: true }))
}
