use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use vision_classifier::ChatTurn;

use crate::error::ApiError;
use crate::images::load_images;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct LlmRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    /// Images given as URLs, data URIs or base64
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LlmResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Free-form text generation: a single prompt or a chat transcript, plus optional images.
///
/// With `messages`, images are attached to the last turn.
pub async fn llm_handler(
    State(state): State<AppState>,
    Json(request): Json<LlmRequest>,
) -> Result<Json<LlmResponse>, ApiError> {
    let has_prompt = request.prompt.as_deref().is_some_and(|p| !p.trim().is_empty());
    let has_messages = request.messages.as_ref().is_some_and(|m| !m.is_empty());

    match (has_prompt, has_messages) {
        (false, false) => {
            return Err(ApiError::bad_request(
                "INVALID_REQUEST",
                "Either 'prompt' or 'messages' must be provided",
            ))
        }
        (true, true) => {
            return Err(ApiError::bad_request(
                "INVALID_REQUEST",
                "Provide either 'prompt' or 'messages', not both",
            ))
        }
        _ => {}
    }

    let client = state.require_gemini()?;
    let images = load_images(&state.http, &request.image_urls).await?;
    info!("LLM request with {} images", images.len());

    let text = match (request.prompt, request.messages) {
        (Some(prompt), _) if has_prompt => client.generate_text(&prompt, &images).await?,
        (_, Some(messages)) => {
            let mut turns: Vec<ChatTurn> = messages
                .into_iter()
                .map(|m| ChatTurn {
                    role: m.role,
                    content: Some(m.content),
                    images: Vec::new(),
                })
                .collect();
            if let Some(last) = turns.last_mut() {
                last.images = images;
            }
            client.chat(&turns).await?.content
        }
        _ => String::new(),
    };

    Ok(Json(LlmResponse { text }))
}

/// Generate or edit an image; responds with raw PNG bytes.
pub async fn generate_image_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateImageRequest>,
) -> Result<Response, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("INVALID_REQUEST", "'prompt' must not be empty"));
    }

    let client = state.require_gemini()?;
    let images = load_images(&state.http, &request.image_urls).await?;
    info!("Image generation request with {} input images", images.len());

    let bytes = client
        .generate_image(&request.prompt, &images)
        .await?
        .ok_or_else(|| ApiError::upstream("Model returned no image"))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
