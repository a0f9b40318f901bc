use serde::{Deserialize, Serialize};

use crate::geometry::{NormalizedBox, PixelBox, Rgb};

/// Which input drove the extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Mask,
    Color,
}

/// What backs a region: a segmentation confidence or the seed color it was grown from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionSignal {
    Confidence(f32),
    Color(Rgb),
}

/// One candidate object found in an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bbox: PixelBox,
    pub bbox_normalized: NormalizedBox,
    /// Number of pixels belonging to the region
    pub area: u64,
    pub area_normalized: f64,
    pub signal: RegionSignal,
    /// Position of the source mask in the caller's list (mask mode only)
    pub mask_index: Option<usize>,
}

impl Region {
    pub(crate) fn new(
        bbox: PixelBox,
        area: u64,
        signal: RegionSignal,
        mask_index: Option<usize>,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let total = image_width as f64 * image_height as f64;
        Self {
            bbox,
            bbox_normalized: bbox.normalized(image_width, image_height),
            area,
            area_normalized: if total > 0.0 { area as f64 / total } else { 0.0 },
            signal,
            mask_index,
        }
    }

    /// Normalized center of the bounding box.
    pub fn center(&self) -> (f64, f64) {
        self.bbox_normalized.center()
    }

    pub fn confidence(&self) -> Option<f32> {
        match self.signal {
            RegionSignal::Confidence(c) => Some(c),
            RegionSignal::Color(_) => None,
        }
    }

    pub fn color(&self) -> Option<Rgb> {
        match self.signal {
            RegionSignal::Color(c) => Some(c),
            RegionSignal::Confidence(_) => None,
        }
    }

    /// Flatten into the JSON shape consumed by classification and scene export.
    pub fn to_record(&self, id: String) -> RegionRecord {
        let (x, y) = self.center();
        RegionRecord {
            id,
            position: Position { x, y },
            dimensions: Dimensions {
                width: self.bbox_normalized.width(),
                height: self.bbox_normalized.height(),
            },
            confidence: self.confidence(),
            color: self.color(),
            bbox_normalized: self.bbox_normalized,
            bbox_pixels: self.bbox,
            area_pixels: self.area,
            area_normalized: self.area_normalized,
            mask_index: self.mask_index,
        }
    }
}

/// Regions from one image, largest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSet {
    pub mode: ExtractionMode,
    pub image_width: u32,
    pub image_height: u32,
    pub regions: Vec<Region>,
}

impl DetectionSet {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// Records with ids `obj_1`, `obj_2`, ... in set order.
    pub fn to_records(&self) -> Vec<RegionRecord> {
        self.regions
            .iter()
            .enumerate()
            .map(|(i, region)| region.to_record(format!("obj_{}", i + 1)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Serializable view of a [`Region`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub id: String,
    pub position: Position,
    pub dimensions: Dimensions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    pub bbox_normalized: NormalizedBox,
    pub bbox_pixels: PixelBox,
    #[serde(default)]
    pub area_pixels: u64,
    #[serde(default)]
    pub area_normalized: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_index: Option<usize>,
}
