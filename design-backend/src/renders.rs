use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use vision_classifier::prompts;

use crate::error::ApiError;
use crate::images::generate_from_image;
use crate::projects::require_project;
use crate::store::ProjectStore;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RenderGenerateRequest {
    pub project_id: String,
    /// Sketch or floorplan to render (URL, data URI or base64)
    pub sketch_data: String,
}

#[derive(Debug, Deserialize)]
pub struct RenderReviseRequest {
    pub project_id: String,
    pub image_url: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub project_id: String,
    pub image_url: String,
}

/// Record a render on its project. `None` when the project is gone.
pub(crate) async fn save_render(
    store: &ProjectStore,
    project_id: &str,
    sketch_data: Option<String>,
    image_url: String,
) -> Option<()> {
    store
        .update(project_id, move |project| {
            if let Some(sketch) = sketch_data {
                project.sketch_data = Some(Value::String(sketch));
            }
            project.image_url = Some(image_url);
        })
        .await
}

/// Photorealistic top-down render of a sketch or floorplan.
pub async fn generate_render_handler(
    State(state): State<AppState>,
    Json(request): Json<RenderGenerateRequest>,
) -> Result<Json<RenderResponse>, ApiError> {
    require_project(&state, &request.project_id).await?;
    if request.sketch_data.trim().is_empty() {
        return Err(ApiError::bad_request("INVALID_REQUEST", "'sketch_data' must not be empty"));
    }
    info!("Rendering project {}", request.project_id);

    let image_url =
        generate_from_image(&state, &request.sketch_data, prompts::PHOTOREALISTIC_PROMPT).await?;
    save_render(
        &state.store,
        &request.project_id,
        Some(request.sketch_data),
        image_url.clone(),
    )
    .await
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(Json(RenderResponse {
        project_id: request.project_id,
        image_url,
    }))
}

pub async fn revise_render_handler(
    State(state): State<AppState>,
    Json(request): Json<RenderReviseRequest>,
) -> Result<Json<RenderResponse>, ApiError> {
    require_project(&state, &request.project_id).await?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("INVALID_REQUEST", "'prompt' must not be empty"));
    }
    info!("Revising render for project {}", request.project_id);

    let image_url = generate_from_image(
        &state,
        &request.image_url,
        &prompts::render_revision_prompt(&request.prompt),
    )
    .await?;
    save_render(&state.store, &request.project_id, None, image_url.clone())
        .await
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(Json(RenderResponse {
        project_id: request.project_id,
        image_url,
    }))
}

pub async fn get_render_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<RenderResponse>, ApiError> {
    let project = require_project(&state, &project_id).await?;
    let image_url = project
        .image_url
        .ok_or_else(|| ApiError::not_found("Image not generated yet"))?;

    Ok(Json(RenderResponse {
        project_id,
        image_url,
    }))
}
