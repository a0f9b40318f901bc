use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::error::ApiError;
use crate::store::Project;
use crate::AppState;

pub async fn create_project_handler(State(state): State<AppState>) -> (StatusCode, Json<Project>) {
    let project = state.store.create().await;
    info!("Created project {}", project.project_id);
    (StatusCode::CREATED, Json(project))
}

pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    state
        .store
        .get(&project_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

/// Fetch a project or fail the request with 404.
pub(crate) async fn require_project(state: &AppState, project_id: &str) -> Result<Project, ApiError> {
    state
        .store
        .get(project_id)
        .await
        .ok_or_else(|| ApiError::not_found("Project not found"))
}
