use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, Json};
use image::RgbImage;
use region_extractor::{
    extract_regions_with_observer, DebugImageWriter, DetectionSet, ExtractionConfig,
    ExtractionMode, RegionRecord, SoftMask, TracingObserver,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::images::{decode_inline, decode_rgb};
use crate::{AppState, Settings};

/// A soft mask sent over the wire, either as a grayscale image or as raw values.
#[derive(Debug, Clone, Deserialize)]
pub struct MaskInput {
    /// Base64 or data URI of a grayscale image; 255 reads as 1.0
    #[serde(default)]
    pub image: Option<String>,
    /// Row-major values in [0, 1]; requires `width` and `height`
    #[serde(default)]
    pub values: Option<Vec<f32>>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub score: Option<f32>,
}

impl MaskInput {
    pub fn into_soft_mask(self, index: usize) -> Result<SoftMask, ApiError> {
        let mask = match (self.image, self.values) {
            (Some(image), _) => {
                let decoded = decode_inline(&image)?;
                let luma = region_extractor::decode_image(&decoded.bytes)
                    .map(|rgb| image::DynamicImage::ImageRgb8(rgb).to_luma8())?;
                SoftMask::from_luma(&luma)?
            }
            (None, Some(values)) => {
                let (Some(width), Some(height)) = (self.width, self.height) else {
                    return Err(ApiError::bad_request(
                        "INVALID_MASK",
                        format!("Mask {} has values but no width/height", index),
                    ));
                };
                SoftMask::new(width, height, values)?
            }
            (None, None) => {
                return Err(ApiError::bad_request(
                    "INVALID_MASK",
                    format!("Mask {} needs either an image or values", index),
                ))
            }
        };

        Ok(match self.score {
            Some(score) => mask.with_score(score),
            None => mask,
        })
    }
}

pub fn parse_masks(masks: Option<Vec<MaskInput>>) -> Result<Option<Vec<SoftMask>>, ApiError> {
    masks
        .map(|list| {
            list.into_iter()
                .enumerate()
                .map(|(i, m)| m.into_soft_mask(i))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
}

/// Run extraction off the async runtime, bounded by the configured timeout.
pub async fn run_extraction(
    settings: &Settings,
    image: RgbImage,
    masks: Option<Vec<SoftMask>>,
    config: ExtractionConfig,
) -> Result<DetectionSet, ApiError> {
    config.validate()?;

    let debug_dir = settings
        .debug_output_dir
        .as_ref()
        .map(|dir| dir.join(Uuid::new_v4().to_string()));
    let limit = Duration::from_secs(settings.extraction_timeout_secs);
    let start = Instant::now();

    let task = tokio::task::spawn_blocking(move || match debug_dir {
        Some(dir) => {
            let mut writer = DebugImageWriter::new(dir);
            extract_regions_with_observer(&image, masks.as_deref(), &config, &mut writer)
        }
        None => extract_regions_with_observer(&image, masks.as_deref(), &config, &mut TracingObserver),
    });

    let detections = tokio::time::timeout(limit, task)
        .await
        .map_err(|_| {
            ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "EXTRACTION_TIMEOUT",
                format!("Region extraction exceeded {}s", limit.as_secs()),
            )
        })?
        .map_err(|e| ApiError::internal(format!("Extraction task failed: {}", e)))??;

    info!(
        "Extracted {} regions in {:.1}ms",
        detections.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(detections)
}

#[derive(Debug, Deserialize)]
pub struct ExtractRegionsRequest {
    /// Base64 encoded image (PNG or JPEG), raw or as a data URI
    pub image: String,
    /// Segmentation masks; color mode is used when absent
    #[serde(default)]
    pub masks: Option<Vec<MaskInput>>,
    #[serde(default)]
    pub config: ExtractionConfig,
}

#[derive(Debug, Serialize)]
pub struct ExtractRegionsResponse {
    pub mode: ExtractionMode,
    pub image_width: u32,
    pub image_height: u32,
    pub total_regions: usize,
    pub regions: Vec<RegionRecord>,
}

impl From<DetectionSet> for ExtractRegionsResponse {
    fn from(detections: DetectionSet) -> Self {
        let regions = detections.to_records();
        Self {
            mode: detections.mode,
            image_width: detections.image_width,
            image_height: detections.image_height,
            total_regions: regions.len(),
            regions,
        }
    }
}

pub async fn extract_regions_handler(
    State(state): State<AppState>,
    Json(request): Json<ExtractRegionsRequest>,
) -> Result<Json<ExtractRegionsResponse>, ApiError> {
    info!(
        "Received region extraction request ({} masks)",
        request.masks.as_ref().map_or(0, Vec::len)
    );

    let image = decode_rgb(&decode_inline(&request.image)?)?;
    let masks = parse_masks(request.masks)?;
    let detections = run_extraction(&state.settings, image, masks, request.config).await?;

    Ok(Json(detections.into()))
}
