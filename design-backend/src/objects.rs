use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::catalog::ObjectModel;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ObjectTypesResponse {
    pub types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ObjectModelsResponse {
    pub object_type: String,
    pub models: Vec<ObjectModel>,
}

#[derive(Debug, Serialize)]
pub struct ObjectDetailResponse {
    pub object_type: String,
    pub model: ObjectModel,
}

pub async fn object_types_handler(State(state): State<AppState>) -> Json<ObjectTypesResponse> {
    Json(ObjectTypesResponse {
        types: state.catalog.type_names(),
    })
}

pub async fn object_models_handler(
    State(state): State<AppState>,
    Path(object_type): Path<String>,
) -> Result<Json<ObjectModelsResponse>, ApiError> {
    let models = state
        .catalog
        .models(&object_type)
        .ok_or_else(|| ApiError::not_found("Object type not found"))?;

    Ok(Json(ObjectModelsResponse {
        models: models.to_vec(),
        object_type,
    }))
}

pub async fn object_detail_handler(
    State(state): State<AppState>,
    Path((object_type, model_id)): Path<(String, String)>,
) -> Result<Json<ObjectDetailResponse>, ApiError> {
    if state.catalog.models(&object_type).is_none() {
        return Err(ApiError::not_found("Object type not found"));
    }
    let model = state
        .catalog
        .model(&object_type, &model_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Model not found"))?;

    Ok(Json(ObjectDetailResponse { object_type, model }))
}
