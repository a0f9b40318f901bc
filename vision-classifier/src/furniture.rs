use region_extractor::{Dimensions, NormalizedBox, PixelBox, Position, RegionRecord};
use serde::{Deserialize, Serialize};

use crate::prompts::describe_aspect_ratio;
use crate::taxonomy::FurnitureTaxonomy;

/// How sure the model said it was. `Error` marks a fallback produced after a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    Error,
    #[serde(other)]
    Unknown,
}

impl ConfidenceLevel {
    pub(crate) fn rank(self) -> u8 {
        match self {
            ConfidenceLevel::High => 3,
            ConfidenceLevel::Medium => 2,
            ConfidenceLevel::Low => 1,
            ConfidenceLevel::Unknown | ConfidenceLevel::Error => 0,
        }
    }
}

fn default_confidence() -> ConfidenceLevel {
    ConfidenceLevel::Unknown
}

/// One label for one region, as returned by the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureClassification {
    pub furniture_id: String,
    pub furniture_name: String,
    #[serde(default = "default_confidence")]
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub reasoning: String,
}

impl FurnitureClassification {
    /// The `other` label with an explanation of why nothing better was produced.
    pub fn fallback(
        taxonomy: &FurnitureTaxonomy,
        confidence: ConfidenceLevel,
        reasoning: impl Into<String>,
    ) -> Self {
        let other = taxonomy.other();
        Self {
            furniture_id: other.id.clone(),
            furniture_name: other.name.clone(),
            confidence,
            reasoning: reasoning.into(),
        }
    }

    /// Map labels outside the taxonomy onto `other`, keeping the model's reasoning.
    pub fn normalized(mut self, taxonomy: &FurnitureTaxonomy) -> Self {
        match taxonomy.get(&self.furniture_id) {
            Some(t) => {
                self.furniture_name = t.name.clone();
                self
            }
            None => {
                let other = taxonomy.other();
                self.furniture_id = other.id.clone();
                self.furniture_name = other.name.clone();
                self
            }
        }
    }

    pub fn is_error(&self) -> bool {
        self.confidence == ConfidenceLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectRatioInfo {
    pub value: f64,
    /// What the taxonomy says this type usually looks like
    pub typical: String,
    pub description: String,
}

/// A region merged with its label, in the shape the floorplan editor consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureObject {
    pub id: String,
    #[serde(rename = "type")]
    pub furniture_type: String,
    pub name: String,
    pub position: Position,
    pub dimensions: Dimensions,
    pub bbox_normalized: NormalizedBox,
    pub bbox_pixels: PixelBox,
    pub confidence: ConfidenceLevel,
    pub reasoning: String,
    pub aspect_ratio: AspectRatioInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_confidence: Option<f32>,
}

impl FurnitureObject {
    pub fn new(
        record: &RegionRecord,
        classification: &FurnitureClassification,
        taxonomy: &FurnitureTaxonomy,
    ) -> Self {
        let ratio = pixel_aspect_ratio(&record.bbox_pixels);
        let typical = taxonomy
            .get(&classification.furniture_id)
            .map(|t| t.aspect_ratio.clone())
            .unwrap_or_else(|| "any".to_string());

        Self {
            id: record.id.clone(),
            furniture_type: classification.furniture_id.clone(),
            name: classification.furniture_name.clone(),
            position: record.position,
            dimensions: record.dimensions,
            bbox_normalized: record.bbox_normalized,
            bbox_pixels: record.bbox_pixels,
            confidence: classification.confidence,
            reasoning: classification.reasoning.clone(),
            aspect_ratio: AspectRatioInfo {
                value: (ratio * 100.0).round() / 100.0,
                typical,
                description: describe_aspect_ratio(ratio).to_string(),
            },
            detection_confidence: record.confidence,
        }
    }
}

/// Width over height in pixels; 1.0 for degenerate boxes.
pub fn pixel_aspect_ratio(bbox: &PixelBox) -> f64 {
    if bbox.height() > 0 {
        bbox.width() as f64 / bbox.height() as f64
    } else {
        1.0
    }
}
