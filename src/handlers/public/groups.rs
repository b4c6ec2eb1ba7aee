// handlers/public/groups.rs - GET /api/getGroups

use axum::extract::State;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct GroupNames {
    pub groups: Vec<String>,
}

/// GET /api/getGroups - Group names for the form's multi-select
pub async fn get_groups(State(state): State<AppState>) -> ApiResult<GroupNames> {
    let groups = state.directory.group_names().await?;
    Ok(ApiResponse::success(GroupNames { groups }))
}
