use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::store::{Dimensions2D, FloorplanObject, Position2D};
use crate::AppState;

/// Loosely-shaped object as posted by the editor; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneInput {
    #[serde(default, alias = "object_id")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub object_type: String,
    #[serde(default, alias = "modelId")]
    pub model_id: String,
    #[serde(default)]
    pub position: Position2D,
    #[serde(default)]
    pub dimensions: Dimensions2D,
}

impl From<&FloorplanObject> for SceneInput {
    fn from(obj: &FloorplanObject) -> Self {
        Self {
            id: obj.object_id.clone(),
            object_type: obj.object_type.clone(),
            model_id: obj.model_id.clone(),
            position: obj.position,
            dimensions: obj.dimensions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnityObject {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(rename = "modelId")]
    pub model_id: String,
    pub position: Vec3,
    pub scale: Vec3,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnityScene {
    pub objects: Vec<UnityObject>,
}

/// Map floorplan objects into Unity's y-up space.
///
/// The plan's y axis becomes Unity's z axis, objects sit on the floor (y = 0),
/// and footprints are scaled from centimetres to metres.
pub fn convert_to_unity<'a>(objects: impl IntoIterator<Item = &'a SceneInput>) -> UnityScene {
    UnityScene {
        objects: objects
            .into_iter()
            .map(|obj| UnityObject {
                id: obj.id.clone(),
                object_type: obj.object_type.clone(),
                model_id: obj.model_id.clone(),
                position: Vec3 {
                    x: obj.position.x,
                    y: 0.0,
                    z: obj.position.y,
                },
                scale: Vec3 {
                    x: obj.dimensions.x / 100.0,
                    y: obj.dimensions.y / 100.0,
                    z: 1.0,
                },
            })
            .collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct SceneExportResponse {
    pub unity_scene: UnityScene,
}

#[derive(Debug, Deserialize)]
pub struct SceneGenerateRequest {
    pub project_id: String,
}

#[derive(Debug, Serialize)]
pub struct SceneResponse {
    pub project_id: String,
    pub unity_scene: UnityScene,
}

pub async fn export_scene_handler(Json(objects): Json<Vec<SceneInput>>) -> Json<SceneExportResponse> {
    info!("Exporting {} objects to Unity", objects.len());
    Json(SceneExportResponse {
        unity_scene: convert_to_unity(&objects),
    })
}

/// Convert a project's constructed floorplan and keep the result as its scene.
pub async fn generate_scene_handler(
    State(state): State<AppState>,
    Json(request): Json<SceneGenerateRequest>,
) -> Result<Json<SceneResponse>, ApiError> {
    let scene = state
        .store
        .update(&request.project_id, |project| {
            let inputs: Vec<SceneInput> = project
                .constructed_objects()?
                .iter()
                .map(SceneInput::from)
                .collect();
            let scene = convert_to_unity(&inputs);
            project.scene_data = Some(scene.clone());
            Some(scene)
        })
        .await
        .ok_or_else(|| ApiError::not_found("Project not found"))?
        .ok_or_else(|| ApiError::not_found("Floorplan not found"))?;

    Ok(Json(SceneResponse {
        project_id: request.project_id,
        unity_scene: scene,
    }))
}
