use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// An image passed to the model inline.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl InlineImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    /// "user" or "model"
    pub role: String,
    pub content: Option<String>,
    pub images: Vec<InlineImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub role: String,
    pub content: String,
}

/// Text and image generation through the Gemini REST API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    text_model: String,
    image_model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: String,
}

impl GeminiClient {
    /// # Arguments
    /// * `api_key` - Gemini API key
    /// * `text_model` - defaults to "gemini-2.5-flash"
    /// * `image_model` - defaults to "gemini-2.5-flash-image"
    pub fn new(api_key: String, text_model: Option<String>, image_model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            text_model: text_model.unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            image_model: image_model.unwrap_or_else(|| "gemini-2.5-flash-image".to_string()),
        }
    }

    /// Create from GEMINI_API_KEY, with optional GEMINI_TEXT_MODEL / GEMINI_IMAGE_MODEL overrides
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Ok(Self::new(
            api_key,
            std::env::var("GEMINI_TEXT_MODEL").ok(),
            std::env::var("GEMINI_IMAGE_MODEL").ok(),
        ))
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> anyhow::Result<String> {
        let contents = json!([{ "role": "user", "parts": user_parts(prompt, images) }]);
        let response = self.generate(&self.text_model, contents).await?;
        Ok(response_text(&response))
    }

    /// Returns `None` when the model answered without producing an image.
    pub async fn generate_image(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let contents = json!([{ "role": "user", "parts": user_parts(prompt, images) }]);
        let response = self.generate(&self.image_model, contents).await?;
        response_image(&response)
    }

    pub async fn chat(&self, turns: &[ChatTurn]) -> anyhow::Result<ChatReply> {
        let contents = Value::Array(turns.iter().map(chat_content).collect());
        let response = self.generate(&self.text_model, contents).await?;
        Ok(ChatReply {
            role: "model".to_string(),
            content: response_text(&response),
        })
    }

    async fn generate(&self, model: &str, contents: Value) -> anyhow::Result<GenerateResponse> {
        info!("Sending request to Gemini API (model: {})", model);

        let response = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_API_BASE, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "contents": contents }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            warn!("Gemini API error: {} - {}", status, error_text);
            return Err(anyhow::anyhow!("Gemini API error: {} - {}", status, error_text));
        }

        Ok(response.json().await?)
    }
}

/// Images first, then the prompt text.
fn user_parts(prompt: &str, images: &[InlineImage]) -> Value {
    let mut parts: Vec<Value> = images.iter().map(image_part).collect();
    parts.push(json!({ "text": prompt }));
    Value::Array(parts)
}

fn image_part(image: &InlineImage) -> Value {
    json!({
        "inline_data": {
            "mime_type": image.mime_type,
            "data": general_purpose::STANDARD.encode(&image.bytes),
        }
    })
}

fn chat_content(turn: &ChatTurn) -> Value {
    let mut parts: Vec<Value> = turn.images.iter().map(image_part).collect();
    if let Some(text) = turn.content.as_deref().filter(|t| !t.is_empty()) {
        parts.push(json!({ "text": text }));
    }
    json!({ "role": turn.role, "parts": parts })
}

/// Concatenated text of the first candidate.
fn response_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Decoded bytes of the first inline image of the first candidate.
fn response_image(response: &GenerateResponse) -> anyhow::Result<Option<Vec<u8>>> {
    let data = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.iter().find_map(|p| p.inline_data.as_ref()));

    match data {
        Some(inline) => Ok(Some(general_purpose::STANDARD.decode(&inline.data)?)),
        None => Ok(None),
    }
}
