use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Thresholds for a single extraction call.
///
/// Every field has a default, so partial JSON objects deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum fraction of the image width/height a region may span
    #[serde(default = "default_max_size_ratio")]
    pub max_size_ratio: f64,
    /// Intersection over the smaller area at which the smaller mask is dropped
    #[serde(default = "default_overlap_threshold")]
    pub overlap_threshold: f64,
    /// Soft mask values strictly above this are treated as set
    #[serde(default = "default_mask_threshold")]
    pub mask_threshold: f32,
    /// Chebyshev radius searched around each pixel while growing a color region
    #[serde(default = "default_neighbor_radius")]
    pub neighbor_radius: u32,
    /// Pixels join a region when |dr| + |dg| + |db| against the seed is below this
    #[serde(default = "default_color_tolerance")]
    pub color_tolerance: u32,
    /// Pixels whose channel spread (max - min) is below this are grayscale
    #[serde(default = "default_grayscale_spread")]
    pub grayscale_spread: u8,
    /// All channels at or below this value count as black line-art
    #[serde(default = "default_near_black")]
    pub near_black: u8,
    /// All channels at or above this value count as paper white
    #[serde(default = "default_near_white")]
    pub near_white: u8,
    /// Color regions narrower or shorter than this are dropped
    #[serde(default = "default_min_region_side")]
    pub min_region_side: u32,
}

fn default_max_size_ratio() -> f64 {
    0.5
}

fn default_overlap_threshold() -> f64 {
    0.5
}

fn default_mask_threshold() -> f32 {
    0.5
}

fn default_neighbor_radius() -> u32 {
    5
}

fn default_color_tolerance() -> u32 {
    50
}

fn default_grayscale_spread() -> u8 {
    75
}

fn default_near_black() -> u8 {
    30
}

fn default_near_white() -> u8 {
    225
}

fn default_min_region_side() -> u32 {
    10
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_size_ratio: default_max_size_ratio(),
            overlap_threshold: default_overlap_threshold(),
            mask_threshold: default_mask_threshold(),
            neighbor_radius: default_neighbor_radius(),
            color_tolerance: default_color_tolerance(),
            grayscale_spread: default_grayscale_spread(),
            near_black: default_near_black(),
            near_white: default_near_white(),
            min_region_side: default_min_region_side(),
        }
    }
}

/// Largest possible sum of per-channel differences between two RGB pixels.
const MAX_COLOR_DISTANCE: u32 = 3 * 255;

/// Upper bound on `neighbor_radius`; each visited pixel scans a window of side `2r + 1`.
pub const MAX_NEIGHBOR_RADIUS: u32 = 32;

impl ExtractionConfig {
    /// Reject thresholds outside their meaningful ranges before any pixel is touched.
    pub fn validate(&self) -> Result<()> {
        if !self.max_size_ratio.is_finite() || self.max_size_ratio <= 0.0 || self.max_size_ratio > 1.0 {
            return Err(ExtractError::Configuration(format!(
                "max_size_ratio must be in (0, 1], got {}",
                self.max_size_ratio
            )));
        }
        if !self.overlap_threshold.is_finite() || !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(ExtractError::Configuration(format!(
                "overlap_threshold must be in [0, 1], got {}",
                self.overlap_threshold
            )));
        }
        if !self.mask_threshold.is_finite() || !(0.0..1.0).contains(&self.mask_threshold) {
            return Err(ExtractError::Configuration(format!(
                "mask_threshold must be in [0, 1), got {}",
                self.mask_threshold
            )));
        }
        if self.neighbor_radius == 0 || self.neighbor_radius > MAX_NEIGHBOR_RADIUS {
            return Err(ExtractError::Configuration(format!(
                "neighbor_radius must be in 1..={}, got {}",
                MAX_NEIGHBOR_RADIUS, self.neighbor_radius
            )));
        }
        if self.color_tolerance == 0 || self.color_tolerance > MAX_COLOR_DISTANCE {
            return Err(ExtractError::Configuration(format!(
                "color_tolerance must be in 1..={}, got {}",
                MAX_COLOR_DISTANCE, self.color_tolerance
            )));
        }
        if self.near_black >= self.near_white {
            return Err(ExtractError::Configuration(format!(
                "near_black ({}) must be below near_white ({})",
                self.near_black, self.near_white
            )));
        }
        Ok(())
    }
}
