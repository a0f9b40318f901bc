use base64::{engine::general_purpose, Engine as _};
use image::RgbImage;
use tracing::{info, warn};
use vision_classifier::InlineImage;

use crate::error::ApiError;
use crate::AppState;

pub const ALLOWED_IMAGE_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
];

const FALLBACK_MIME: &str = "image/jpeg";

/// Strip parameters from a content type and fall back to JPEG for anything not allowed.
pub fn normalize_mime(content_type: Option<&str>) -> String {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_IMAGE_TYPES.contains(&mime.as_str()) {
        mime
    } else {
        FALLBACK_MIME.to_string()
    }
}

/// Decode raw base64 or a `data:<mime>;base64,` URI.
pub fn decode_inline(input: &str) -> Result<InlineImage, ApiError> {
    let input = input.trim();
    let (mime, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                ApiError::bad_request("INVALID_IMAGE", "Malformed data URI: missing ','")
            })?;
            (Some(header.trim_end_matches(";base64")), payload)
        }
        None => (None, input),
    };

    let bytes = general_purpose::STANDARD.decode(payload.trim()).map_err(|e| {
        warn!("Failed to decode base64 image: {}", e);
        ApiError::bad_request("INVALID_IMAGE", format!("Failed to decode base64 image: {}", e))
    })?;

    Ok(InlineImage::new(bytes, normalize_mime(mime)))
}

pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Load an image reference: an http(s) URL is fetched, a `data:` URI or bare
/// base64 payload is decoded in place.
pub async fn load_image(client: &reqwest::Client, url: &str) -> Result<InlineImage, ApiError> {
    let is_http = url.starts_with("http://") || url.starts_with("https://");
    if !is_http {
        if url.contains("://") {
            return Err(ApiError::bad_request(
                "INVALID_IMAGE_URL",
                format!("Unsupported image URL: {}", url),
            ));
        }
        return decode_inline(url);
    }

    info!("Fetching image from {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| ApiError::upstream(format!("Failed to fetch image: {}", e)))?;

    let mime_type = normalize_mime(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::upstream(format!("Failed to read image body: {}", e)))?;

    Ok(InlineImage::new(bytes.to_vec(), mime_type))
}

/// Load every reference in order.
pub async fn load_images(
    client: &reqwest::Client,
    urls: &[String],
) -> Result<Vec<InlineImage>, ApiError> {
    let mut images = Vec::with_capacity(urls.len());
    for url in urls {
        images.push(load_image(client, url).await?);
    }
    Ok(images)
}

/// Run Gemini image generation on one source image and return the result as a PNG data URL.
pub async fn generate_from_image(
    state: &AppState,
    source_url: &str,
    prompt: &str,
) -> Result<String, ApiError> {
    let client = state.require_gemini()?;
    let source = load_image(&state.http, source_url).await?;

    let generated = client
        .generate_image(prompt, &[source])
        .await?
        .ok_or_else(|| ApiError::upstream("Model returned no image"))?;
    Ok(to_data_url(&generated, "image/png"))
}

pub fn decode_rgb(image: &InlineImage) -> Result<RgbImage, ApiError> {
    Ok(region_extractor::decode_image(&image.bytes)?)
}
