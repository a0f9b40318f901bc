use futures::stream::{self, StreamExt};
use image::RgbImage;
use region_extractor::{PixelBox, RegionRecord};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

pub mod furniture;
pub mod gemini;
pub mod prompts;
pub mod render;
pub mod taxonomy;
pub mod voting;

pub use furniture::{
    pixel_aspect_ratio, AspectRatioInfo, ConfidenceLevel, FurnitureClassification,
    FurnitureObject,
};
pub use gemini::{ChatReply, ChatTurn, GeminiClient, InlineImage};
pub use taxonomy::{FurnitureTaxonomy, FurnitureType};
pub use voting::majority_vote;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Vision-based furniture classifier using OpenAI Vision API (GPT-4o)
pub struct VisionClassifier {
    client: Client,
    api_key: String,
    model: String,
}

/// How classification of many regions fans out.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyOptions {
    /// Regions classified at once
    pub concurrency: usize,
    /// Requests per region; more than one enables majority voting
    pub votes: usize,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            votes: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl VisionClassifier {
    /// Create a new vision classifier
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key (from OPENAI_API_KEY environment variable)
    /// * `model` - Model to use (default: "gpt-4o")
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o".to_string()),
        }
    }

    /// Create from environment variable, honouring VISION_MODEL if set
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, std::env::var("VISION_MODEL").ok()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Label every region of a floorplan.
    ///
    /// Each region is shown to the model twice: the whole floorplan for context,
    /// and a copy with that region highlighted. Results come back in the same
    /// order as `records`. A region whose request fails gets the `other` label
    /// with `error` confidence instead of failing the batch.
    pub async fn classify_regions(
        &self,
        image: &RgbImage,
        records: &[RegionRecord],
        taxonomy: &FurnitureTaxonomy,
        options: ClassifyOptions,
    ) -> anyhow::Result<Vec<FurnitureObject>> {
        info!(
            "Classifying {} regions with {} (concurrency {}, votes {})",
            records.len(),
            self.model,
            options.concurrency,
            options.votes
        );

        let full_image = render::jpeg_data_uri(image)?;
        let full_image = full_image.as_str();

        let boxes: Vec<PixelBox> = records.iter().map(|record| record.bbox_pixels).collect();
        let classifications: Vec<FurnitureClassification> = stream::iter(boxes)
            .map(|bbox| async move {
                self.classify_region(full_image, image, &bbox, taxonomy, options.votes)
                    .await
            })
            .buffered(options.concurrency.max(1))
            .collect()
            .await;

        let objects = records
            .iter()
            .zip(&classifications)
            .map(|(record, classification)| FurnitureObject::new(record, classification, taxonomy))
            .collect::<Vec<_>>();

        let failed = classifications.iter().filter(|c| c.is_error()).count();
        if failed > 0 {
            warn!("{} of {} regions failed to classify", failed, records.len());
        }

        Ok(objects)
    }

    /// Classify one region, voting over `votes` requests. Never fails.
    pub async fn classify_region(
        &self,
        full_image_uri: &str,
        image: &RgbImage,
        bbox: &PixelBox,
        taxonomy: &FurnitureTaxonomy,
        votes: usize,
    ) -> FurnitureClassification {
        let highlighted = match render::jpeg_data_uri(&render::highlight_region(image, bbox)) {
            Ok(uri) => uri,
            Err(e) => {
                return FurnitureClassification::fallback(
                    taxonomy,
                    ConfidenceLevel::Error,
                    format!("Classification failed: {}", e),
                )
            }
        };
        let prompt = prompts::furniture_prompt(taxonomy, pixel_aspect_ratio(bbox));

        let mut results = Vec::with_capacity(votes.max(1));
        for _ in 0..votes.max(1) {
            let result = self
                .request_classification(&prompt, full_image_uri, &highlighted)
                .await
                .map(|c| c.normalized(taxonomy))
                .unwrap_or_else(|e| {
                    warn!("Error classifying region {:?}: {}", bbox, e);
                    FurnitureClassification::fallback(
                        taxonomy,
                        ConfidenceLevel::Error,
                        format!("Classification failed: {}", e),
                    )
                });
            results.push(result);
        }

        majority_vote(&results).unwrap_or_else(|| {
            FurnitureClassification::fallback(taxonomy, ConfidenceLevel::Unknown, "No votes cast")
        })
    }

    async fn request_classification(
        &self,
        prompt: &str,
        full_image_uri: &str,
        highlighted_uri: &str,
    ) -> anyhow::Result<FurnitureClassification> {
        let content = json!([
            { "type": "text", "text": prompt },
            { "type": "image_url", "image_url": { "url": full_image_uri, "detail": "low" } },
            { "type": "image_url", "image_url": { "url": highlighted_uri, "detail": "high" } }
        ]);

        let response = self.chat_completion(content, 500, Some(0.1)).await?;
        let json_str = extract_json_from_response(&response)?;

        serde_json::from_str(&json_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse classification: {}. Response: {}", e, json_str))
    }

    /// Pick one of `type_names` for a cropped object image.
    ///
    /// Returns `None` when the model answers with something outside the list.
    pub async fn classify_object_type(
        &self,
        crop: &RgbImage,
        type_names: &[String],
    ) -> anyhow::Result<Option<String>> {
        let uri = render::jpeg_data_uri(crop)?;
        let content = json!([
            { "type": "text", "text": prompts::object_type_prompt(type_names) },
            { "type": "image_url", "image_url": { "url": uri } }
        ]);

        let response = self.chat_completion(content, 50, None).await?;
        Ok(match_type_name(&response, type_names))
    }

    async fn chat_completion(
        &self,
        content: Value,
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> anyhow::Result<String> {
        let mut request_body = json!({
            "model": self.model.clone(),
            "messages": [{ "role": "user", "content": content }]
        });

        // Use max_completion_tokens for newer models, max_tokens for older ones
        if self.model.starts_with("gpt-5") || self.model.starts_with("o1") {
            request_body["max_completion_tokens"] = json!(max_tokens);
        } else {
            request_body["max_tokens"] = json!(max_tokens);
            if let Some(t) = temperature {
                request_body["temperature"] = json!(t);
            }
        }

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            warn!("OpenAI API error: {} - {}", status, error_text);
            return Err(anyhow::anyhow!("OpenAI API error: {} - {}", status, error_text));
        }

        let api_response: OpenAIResponse = response.json().await?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("No response from OpenAI API"))
    }
}

/// Extract JSON from GPT response (handles markdown code blocks anywhere in the text)
fn extract_json_from_response(content: &str) -> anyhow::Result<String> {
    let trimmed = content.trim();

    let fenced = match trimmed.find("```json") {
        Some(start) => Some(start + "```json".len()),
        None => trimmed.find("```").map(|start| start + 3),
    };

    let json = match fenced {
        Some(start) => {
            let rest = &trimmed[start..];
            let end = rest.find("```").unwrap_or(rest.len());
            rest[..end].trim()
        }
        None => trimmed,
    };

    if json.is_empty() {
        return Err(anyhow::anyhow!("Empty response from model"));
    }
    Ok(json.to_string())
}

/// Case-insensitive match of a free-text answer against the allowed names.
fn match_type_name(answer: &str, type_names: &[String]) -> Option<String> {
    let answer = answer
        .trim()
        .trim_matches(|c: char| c == '.' || c == '"' || c == '\'' || c == '`')
        .to_lowercase();
    type_names
        .iter()
        .find(|name| name.to_lowercase() == answer)
        .cloned()
}
