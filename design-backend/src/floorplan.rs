use axum::{
    extract::{Path, State},
    Json,
};
use futures::stream::{self, StreamExt};
use image::RgbImage;
use region_extractor::{ExtractionConfig, PixelBox, RegionRecord, Rgb};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use vision_classifier::{
    prompts, render, ClassifyOptions, ConfidenceLevel, FurnitureClassification, FurnitureObject,
};

use crate::catalog::{DEFAULT_MODEL_ID, DEFAULT_OBJECT_TYPE};
use crate::error::ApiError;
use crate::extraction::{parse_masks, run_extraction, MaskInput};
use crate::images::{decode_rgb, generate_from_image, load_image};
use crate::projects::require_project;
use crate::store::{Dimensions2D, FloorplanData, FloorplanObject, Position2D};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FloorplanStepResponse {
    pub project_id: String,
    pub step: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FloorplanResponse {
    pub project_id: String,
    pub objects: Vec<FloorplanObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floorplan_url: Option<String>,
}

impl FloorplanResponse {
    fn new(project_id: String, data: &FloorplanData) -> Self {
        Self {
            project_id,
            objects: data.objects.clone(),
            floorplan_url: data.base_floorplan_url.clone(),
        }
    }
}

fn step(project_id: String, step: &str, data: serde_json::Value) -> Json<FloorplanStepResponse> {
    Json(FloorplanStepResponse {
        project_id,
        step: step.to_string(),
        data,
    })
}

// ---------------------------------------------------------------------------
// Floorplan image generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateBaseRequest {
    pub project_id: String,
    /// Sketch or photo to draw the floorplan from (URL, data URI or base64)
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviseRequest {
    pub project_id: String,
    pub image_url: String,
    pub instruction: String,
}

/// Generate an image from one input image and store it as the project's base floorplan.
async fn generate_and_store(
    state: &AppState,
    project_id: &str,
    image_url: &str,
    prompt: &str,
) -> Result<String, ApiError> {
    let floorplan_url = generate_from_image(state, image_url, prompt).await?;

    let stored = floorplan_url.clone();
    state
        .store
        .update(project_id, move |project| {
            project
                .floorplan_data
                .get_or_insert_with(FloorplanData::default)
                .base_floorplan_url = Some(stored);
        })
        .await
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(floorplan_url)
}

pub async fn generate_base_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateBaseRequest>,
) -> Result<Json<FloorplanStepResponse>, ApiError> {
    require_project(&state, &request.project_id).await?;
    info!("Generating base floorplan for project {}", request.project_id);

    let floorplan_url = generate_and_store(
        &state,
        &request.project_id,
        &request.image_url,
        prompts::FLOORPLAN_GENERATION_PROMPT,
    )
    .await?;

    Ok(step(
        request.project_id,
        "base_generated",
        json!({ "floorplan_url": floorplan_url }),
    ))
}

pub async fn revise_handler(
    State(state): State<AppState>,
    Json(request): Json<ReviseRequest>,
) -> Result<Json<FloorplanStepResponse>, ApiError> {
    require_project(&state, &request.project_id).await?;
    if request.instruction.trim().is_empty() {
        return Err(ApiError::bad_request("INVALID_INSTRUCTION", "Instruction must not be empty"));
    }
    info!("Revising floorplan for project {}", request.project_id);

    let floorplan_url = generate_and_store(
        &state,
        &request.project_id,
        &request.image_url,
        &prompts::floorplan_revision_prompt(&request.instruction),
    )
    .await?;

    Ok(step(
        request.project_id,
        "floorplan_revised",
        json!({ "floorplan_url": floorplan_url }),
    ))
}

/// Box every piece of furniture on a floorplan so it can be located. The result is
/// returned, not stored.
pub async fn add_markers_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateBaseRequest>,
) -> Result<Json<FloorplanStepResponse>, ApiError> {
    require_project(&state, &request.project_id).await?;
    info!("Adding furniture markers for project {}", request.project_id);

    let marked_url = generate_from_image(
        &state,
        &request.image_url,
        &prompts::floorplan_revision_prompt(prompts::FURNITURE_MARKER_INSTRUCTION),
    )
    .await?;

    Ok(step(
        request.project_id,
        "markers_added",
        json!({ "marked_floorplan_url": marked_url }),
    ))
}

// ---------------------------------------------------------------------------
// Entity extraction and classification
// ---------------------------------------------------------------------------

/// Pixel rectangle as `{x, y, w, h}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl EntityBox {
    /// The part of the box inside the image, or `None` if nothing overlaps.
    fn clamped(&self, image_width: u32, image_height: u32) -> Option<PixelBox> {
        let bbox = PixelBox {
            x1: self.x.min(image_width),
            y1: self.y.min(image_height),
            x2: self.x.saturating_add(self.w).min(image_width),
            y2: self.y.saturating_add(self.h).min(image_height),
        };
        (bbox.width() > 0 && bbox.height() > 0).then_some(bbox)
    }
}

/// A colored blob found on a generated floorplan, in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub position: Position2D,
    pub dimensions: Dimensions2D,
    pub bbox: EntityBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl Entity {
    fn from_record(index: usize, record: &RegionRecord) -> Self {
        let b = record.bbox_pixels;
        Self {
            entity_id: format!("entity_{}", index),
            position: Position2D {
                x: (b.x1 + b.x2) as f64 / 2.0,
                y: (b.y1 + b.y2) as f64 / 2.0,
            },
            dimensions: Dimensions2D {
                x: b.width() as f64,
                y: b.height() as f64,
            },
            bbox: EntityBox {
                x: b.x1,
                y: b.y1,
                w: b.width(),
                h: b.height(),
            },
            color: record.color,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEntity {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(rename = "type")]
    pub object_type: String,
    pub model_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractEntitiesRequest {
    pub project_id: String,
    pub floorplan_url: String,
    #[serde(default)]
    pub config: ExtractionConfig,
}

pub async fn extract_entities_handler(
    State(state): State<AppState>,
    Json(request): Json<ExtractEntitiesRequest>,
) -> Result<Json<FloorplanStepResponse>, ApiError> {
    require_project(&state, &request.project_id).await?;

    let image = decode_rgb(&load_image(&state.http, &request.floorplan_url).await?)?;
    let detections = run_extraction(&state.settings, image, None, request.config).await?;

    let entities: Vec<Entity> = detections
        .to_records()
        .iter()
        .enumerate()
        .map(|(i, record)| Entity::from_record(i, record))
        .collect();
    info!("Extracted {} entities for project {}", entities.len(), request.project_id);

    Ok(step(
        request.project_id,
        "entities_extracted",
        json!({ "entities": entities }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ClassifyObjectsRequest {
    pub project_id: String,
    pub entities: Vec<Entity>,
}

pub async fn classify_objects_handler(
    State(state): State<AppState>,
    Json(request): Json<ClassifyObjectsRequest>,
) -> Result<Json<FloorplanStepResponse>, ApiError> {
    let project = require_project(&state, &request.project_id).await?;
    let floorplan_url = project
        .floorplan_data
        .and_then(|data| data.base_floorplan_url)
        .ok_or_else(|| ApiError::bad_request("FLOORPLAN_MISSING", "Floorplan not generated"))?;
    let classifier = state
        .classifier
        .as_deref()
        .ok_or_else(|| ApiError::unavailable("OPENAI_API_KEY not configured"))?;

    let image = decode_rgb(&load_image(&state.http, &floorplan_url).await?)?;
    let type_names = state.catalog.type_names();
    let image = &image;
    let type_names = type_names.as_slice();

    let targets: Vec<(String, EntityBox)> = request
        .entities
        .iter()
        .map(|entity| (entity.entity_id.clone(), entity.bbox))
        .collect();

    let types: Vec<String> = stream::iter(targets)
        .map(|(entity_id, bbox)| async move {
            let Some(crop) = entity_crop(image, &bbox) else {
                warn!("Entity {} lies outside the floorplan", entity_id);
                return DEFAULT_OBJECT_TYPE.to_string();
            };
            match classifier.classify_object_type(&crop, type_names).await {
                Ok(Some(object_type)) => object_type,
                Ok(None) => DEFAULT_OBJECT_TYPE.to_string(),
                Err(e) => {
                    warn!("Failed to classify entity {}: {}", entity_id, e);
                    DEFAULT_OBJECT_TYPE.to_string()
                }
            }
        })
        .buffered(state.settings.classify_concurrency)
        .collect()
        .await;

    let classified: Vec<ClassifiedEntity> = request
        .entities
        .into_iter()
        .zip(types)
        .map(|(entity, object_type)| {
            let model_id = state
                .catalog
                .default_model(&object_type)
                .map(|m| m.model_id.clone())
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
            ClassifiedEntity {
                entity,
                object_type,
                model_id,
            }
        })
        .collect();

    Ok(step(
        request.project_id,
        "objects_classified",
        json!({ "classified_objects": classified }),
    ))
}

fn entity_crop(image: &RgbImage, bbox: &EntityBox) -> Option<RgbImage> {
    let bbox = bbox.clamped(image.width(), image.height())?;
    Some(render::crop_region(image, &bbox, None, 0))
}

#[derive(Debug, Deserialize)]
pub struct ExtractFurnitureRequest {
    pub project_id: String,
    /// Floorplan image (URL, data URI or base64)
    pub image: String,
    /// Segmentation masks; color mode is used when absent
    #[serde(default)]
    pub masks: Option<Vec<MaskInput>>,
    #[serde(default)]
    pub config: ExtractionConfig,
    /// Classification requests per region; defaults to CLASSIFY_VOTES
    #[serde(default)]
    pub votes: Option<usize>,
}

pub async fn extract_furniture_handler(
    State(state): State<AppState>,
    Json(request): Json<ExtractFurnitureRequest>,
) -> Result<Json<FloorplanStepResponse>, ApiError> {
    require_project(&state, &request.project_id).await?;

    let image = decode_rgb(&load_image(&state.http, &request.image).await?)?;
    let masks = parse_masks(request.masks)?;
    let detections = run_extraction(&state.settings, image.clone(), masks, request.config).await?;
    let records = detections.to_records();

    let objects: Vec<FurnitureObject> = match state.classifier.as_deref() {
        Some(classifier) => {
            let options = ClassifyOptions {
                concurrency: state.settings.classify_concurrency,
                votes: request.votes.unwrap_or(state.settings.classify_votes).max(1),
            };
            classifier
                .classify_regions(&image, &records, &state.taxonomy, options)
                .await?
        }
        None => {
            warn!("OPENAI_API_KEY not set - classification will be skipped");
            let skipped = FurnitureClassification::fallback(
                &state.taxonomy,
                ConfidenceLevel::Unknown,
                "No API key",
            );
            records
                .iter()
                .map(|record| FurnitureObject::new(record, &skipped, &state.taxonomy))
                .collect()
        }
    };
    info!("Extracted {} furniture objects for project {}", objects.len(), request.project_id);

    Ok(step(
        request.project_id,
        "furniture_extracted",
        json!({ "total_objects": objects.len(), "objects": objects }),
    ))
}

// ---------------------------------------------------------------------------
// Constructed floorplan editing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ConstructRequest {
    pub project_id: String,
    pub objects: Vec<FloorplanObject>,
}

#[derive(Debug, Deserialize)]
pub struct MoveObjectRequest {
    pub object_id: String,
    pub position: Position2D,
}

#[derive(Debug, Deserialize)]
pub struct ChangeModelRequest {
    pub object_id: String,
    pub model_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateObjectRequest {
    pub project_id: String,
    #[serde(default)]
    pub prompt: String,
}

pub async fn construct_handler(
    State(state): State<AppState>,
    Json(request): Json<ConstructRequest>,
) -> Result<Json<FloorplanResponse>, ApiError> {
    for obj in &request.objects {
        if state.catalog.model(&obj.object_type, &obj.model_id).is_none() {
            return Err(ApiError::bad_request(
                "UNKNOWN_MODEL",
                format!("No model {} for object type {}", obj.model_id, obj.object_type),
            ));
        }
    }

    let objects = request.objects;
    let data = state
        .store
        .update(&request.project_id, move |project| {
            let data = project.floorplan_data.get_or_insert_with(FloorplanData::default);
            data.objects = objects;
            data.constructed = true;
            data.clone()
        })
        .await
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    info!("Constructed floorplan with {} objects for project {}", data.objects.len(), request.project_id);
    Ok(Json(FloorplanResponse::new(request.project_id, &data)))
}

/// Apply `edit` to one object of a constructed floorplan.
async fn edit_object(
    state: &AppState,
    project_id: &str,
    object_id: &str,
    edit: impl FnOnce(&mut FloorplanObject) -> Result<(), ApiError>,
) -> Result<FloorplanData, ApiError> {
    state
        .store
        .update(project_id, |project| {
            let data = project
                .floorplan_data
                .as_mut()
                .filter(|data| data.constructed)
                .ok_or_else(|| ApiError::not_found("Floorplan not found"))?;
            let obj = data
                .objects
                .iter_mut()
                .find(|o| o.object_id == object_id)
                .ok_or_else(|| ApiError::not_found("Object not found"))?;
            edit(obj)?;
            Ok(data.clone())
        })
        .await
        .unwrap_or_else(|| Err(ApiError::not_found("Floorplan not found")))
}

pub async fn move_object_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<MoveObjectRequest>,
) -> Result<Json<FloorplanResponse>, ApiError> {
    let data = edit_object(&state, &project_id, &request.object_id, |obj| {
        obj.position = request.position;
        Ok(())
    })
    .await?;

    Ok(Json(FloorplanResponse::new(project_id, &data)))
}

pub async fn change_model_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<ChangeModelRequest>,
) -> Result<Json<FloorplanResponse>, ApiError> {
    let catalog = state.catalog.clone();
    let data = edit_object(&state, &project_id, &request.object_id, |obj| {
        if catalog.model(&obj.object_type, &request.model_id).is_none() {
            return Err(ApiError::bad_request(
                "UNKNOWN_MODEL",
                format!("No model {} for object type {}", request.model_id, obj.object_type),
            ));
        }
        obj.model_id = request.model_id.clone();
        Ok(())
    })
    .await?;

    Ok(Json(FloorplanResponse::new(project_id, &data)))
}

/// Add a placeholder object for the editor to position.
pub async fn generate_object_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateObjectRequest>,
) -> Result<Json<FloorplanResponse>, ApiError> {
    let new_object = FloorplanObject {
        object_id: Uuid::new_v4().to_string(),
        object_type: DEFAULT_OBJECT_TYPE.to_string(),
        model_id: DEFAULT_MODEL_ID.to_string(),
        position: Position2D { x: 0.0, y: 0.0 },
        dimensions: Dimensions2D { x: 50.0, y: 50.0 },
    };
    if !request.prompt.is_empty() {
        info!("Generating object from prompt: {}", request.prompt);
    }

    let data = state
        .store
        .update(&request.project_id, move |project| {
            let data = project
                .floorplan_data
                .as_mut()
                .filter(|data| data.constructed)?;
            data.objects.push(new_object);
            Some(data.clone())
        })
        .await
        .flatten()
        .ok_or_else(|| ApiError::not_found("Floorplan not found"))?;

    Ok(Json(FloorplanResponse::new(request.project_id, &data)))
}

pub async fn get_floorplan_handler(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<FloorplanResponse>, ApiError> {
    let data = state
        .store
        .get(&project_id)
        .await
        .and_then(|project| project.floorplan_data)
        .filter(|data| data.constructed)
        .ok_or_else(|| ApiError::not_found("Floorplan not found"))?;

    Ok(Json(FloorplanResponse::new(project_id, &data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_extractor::{Dimensions, NormalizedBox, Position};

    #[test]
    fn test_entity_from_record() {
        let record = RegionRecord {
            id: "obj_1".into(),
            position: Position { x: 0.25, y: 0.25 },
            dimensions: Dimensions { width: 0.3, height: 0.1 },
            confidence: None,
            color: Some(Rgb::new(220, 30, 30)),
            bbox_normalized: NormalizedBox { x1: 0.1, y1: 0.2, x2: 0.4, y2: 0.3 },
            bbox_pixels: PixelBox { x1: 10, y1: 20, x2: 40, y2: 30 },
            area_pixels: 300,
            area_normalized: 0.03,
            mask_index: None,
        };

        let entity = Entity::from_record(0, &record);
        assert_eq!(entity.entity_id, "entity_0");
        assert_eq!(entity.position, Position2D { x: 25.0, y: 25.0 });
        assert_eq!(entity.dimensions, Dimensions2D { x: 30.0, y: 10.0 });
        assert_eq!(entity.bbox, EntityBox { x: 10, y: 20, w: 30, h: 10 });
    }

    #[test]
    fn test_entity_box_clamping() {
        let bbox = EntityBox { x: 90, y: 5, w: 20, h: 10 };
        assert_eq!(
            bbox.clamped(100, 100),
            Some(PixelBox { x1: 90, y1: 5, x2: 100, y2: 15 })
        );
        assert!(EntityBox { x: 120, y: 5, w: 20, h: 10 }.clamped(100, 100).is_none());
        assert!(EntityBox { x: 5, y: 5, w: 0, h: 10 }.clamped(100, 100).is_none());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_classification_handlers_are_send() {
        let state = AppState::new(crate::Settings::default());

        let classify = classify_objects_handler(
            State(state.clone()),
            Json(ClassifyObjectsRequest {
                project_id: "p".into(),
                entities: Vec::new(),
            }),
        );
        assert_send(&classify);

        let furniture = extract_furniture_handler(
            State(state),
            Json(ExtractFurnitureRequest {
                project_id: "p".into(),
                image: String::new(),
                masks: None,
                config: ExtractionConfig::default(),
                votes: None,
            }),
        );
        assert_send(&furniture);
    }

    #[test]
    fn test_entity_crop_size() {
        let image = RgbImage::new(50, 50);
        let crop = entity_crop(&image, &EntityBox { x: 40, y: 40, w: 20, h: 5 }).unwrap();
        assert_eq!(crop.dimensions(), (10, 5));
    }

    #[test]
    fn test_classified_entity_flattens() {
        let classified = ClassifiedEntity {
            entity: Entity {
                entity_id: "entity_3".into(),
                position: Position2D { x: 1.0, y: 2.0 },
                dimensions: Dimensions2D { x: 3.0, y: 4.0 },
                bbox: EntityBox { x: 0, y: 0, w: 3, h: 4 },
                color: None,
            },
            object_type: "table".into(),
            model_id: "001".into(),
        };
        let json = serde_json::to_value(&classified).unwrap();
        assert_eq!(json["entity_id"], "entity_3");
        assert_eq!(json["type"], "table");
        assert_eq!(json["bbox"]["w"], 3);
        assert!(json.get("color").is_none());
    }
}
