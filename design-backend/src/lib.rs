//! HTTP service for the sketch → floorplan → furniture → scene pipeline.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Json},
    http::{header, Method},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use vision_classifier::{FurnitureTaxonomy, GeminiClient, VisionClassifier};

pub mod ai;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extraction;
pub mod floorplan;
pub mod images;
pub mod objects;
pub mod projects;
pub mod renders;
pub mod scene;
pub mod store;

pub use catalog::ObjectCatalog;
pub use config::Settings;
pub use error::{ApiError, ErrorResponse};
pub use store::ProjectStore;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: ProjectStore,
    pub catalog: Arc<ObjectCatalog>,
    pub taxonomy: Arc<FurnitureTaxonomy>,
    pub classifier: Option<Arc<VisionClassifier>>,
    pub gemini: Option<Arc<GeminiClient>>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state from settings; AI clients exist only when their API key is set.
    pub fn new(settings: Settings) -> Self {
        let classifier = settings.openai_api_key.clone().map(|key| {
            Arc::new(VisionClassifier::new(key, settings.vision_model.clone()))
        });
        let gemini = settings.gemini_api_key.clone().map(|key| {
            Arc::new(GeminiClient::new(
                key,
                settings.gemini_text_model.clone(),
                settings.gemini_image_model.clone(),
            ))
        });

        if classifier.is_none() {
            warn!("OPENAI_API_KEY not set - furniture classification disabled");
        }
        if gemini.is_none() {
            warn!("GEMINI_API_KEY not set - image and text generation disabled");
        }

        Self {
            settings: Arc::new(settings),
            store: ProjectStore::new(),
            catalog: Arc::new(ObjectCatalog::default()),
            taxonomy: Arc::new(FurnitureTaxonomy::default()),
            classifier,
            gemini,
            http: reqwest::Client::new(),
        }
    }

    pub fn require_gemini(&self) -> Result<&GeminiClient, ApiError> {
        self.gemini
            .as_deref()
            .ok_or_else(|| ApiError::unavailable("GEMINI_API_KEY not configured"))
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn root(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("Welcome to {}", state.settings.app_name),
    }))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        // Fallback to Any only if no valid origins configured (not recommended for production)
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

pub fn create_app(state: AppState) -> Router {
    info!(
        "Configuring routes (body limit {} bytes, {} allowed origins)",
        state.settings.max_body_bytes,
        state.settings.allowed_origins.len()
    );
    let cors = cors_layer(&state.settings.allowed_origins);
    let body_limit = state.settings.max_body_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/projects", post(projects::create_project_handler))
        .route("/projects/:project_id", get(projects::get_project_handler))
        .route("/objects/types", get(objects::object_types_handler))
        .route("/objects/models/:object_type", get(objects::object_models_handler))
        .route("/objects/:object_type/:model_id", get(objects::object_detail_handler))
        .route("/extract/regions", post(extraction::extract_regions_handler))
        .route("/floorplan/generate-base", post(floorplan::generate_base_handler))
        .route("/floorplan/revise", post(floorplan::revise_handler))
        .route("/floorplan/add-markers", post(floorplan::add_markers_handler))
        .route("/floorplan/extract-entities", post(floorplan::extract_entities_handler))
        .route("/floorplan/extract-furniture", post(floorplan::extract_furniture_handler))
        .route("/floorplan/classify-objects", post(floorplan::classify_objects_handler))
        .route("/floorplan/construct", post(floorplan::construct_handler))
        .route("/floorplan/generate-object", post(floorplan::generate_object_handler))
        .route("/floorplan/:project_id", get(floorplan::get_floorplan_handler))
        .route("/floorplan/:project_id/move-object", patch(floorplan::move_object_handler))
        .route("/floorplan/:project_id/change-model", patch(floorplan::change_model_handler))
        .route("/image/generate", post(renders::generate_render_handler))
        .route("/image/revise", post(renders::revise_render_handler))
        .route("/image/:project_id", get(renders::get_render_handler))
        .route("/scene/export", post(scene::export_scene_handler))
        .route("/scene/generate", post(scene::generate_scene_handler))
        .route("/ai/llm", post(ai::llm_handler))
        .route("/ai/generate-image", post(ai::generate_image_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_without_keys_has_no_clients() {
        let state = AppState::new(Settings::default());
        assert!(state.classifier.is_none());
        assert!(state.gemini.is_none());
        assert_eq!(state.require_gemini().err().unwrap().code, "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn test_state_with_keys_builds_clients() {
        let state = AppState::new(Settings {
            openai_api_key: Some("sk-test".into()),
            gemini_api_key: Some("g-test".into()),
            vision_model: Some("gpt-4o-mini".into()),
            ..Default::default()
        });
        assert_eq!(state.classifier.as_ref().unwrap().model(), "gpt-4o-mini");
        assert!(state.require_gemini().is_ok());
    }
}
