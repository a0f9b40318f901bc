use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Result};
use crate::geometry::{Bounds, PixelBox};
use crate::observer::{Candidate, ExtractionObserver, RejectReason};
use crate::region::{Region, RegionSignal};

/// Per-pixel soft segmentation output, row-major, values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct SoftMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
    score: Option<f32>,
}

impl SoftMask {
    /// Build a mask from raw values. Non-finite values read as 0, the rest are clamped to [0, 1].
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if expected == 0 || values.len() != expected {
            return Err(ExtractError::MaskShape {
                width,
                height,
                expected,
                actual: values.len(),
            });
        }

        let values = values
            .into_iter()
            .map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 })
            .collect();

        Ok(Self {
            width,
            height,
            values,
            score: None,
        })
    }

    /// Interpret an 8-bit grayscale image as a mask (255 -> 1.0).
    pub fn from_luma(img: &GrayImage) -> Result<Self> {
        let values = img.pixels().map(|p| p[0] as f32 / 255.0).collect();
        Self::new(img.width(), img.height(), values)
    }

    /// Attach the segmentation model's own score for this mask.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score.clamp(0.0, 1.0));
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn score(&self) -> Option<f32> {
        self.score
    }

    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear resize to the target resolution.
    pub fn resized(&self, width: u32, height: u32) -> SoftMask {
        if width == self.width && height == self.height {
            return self.clone();
        }

        let source: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(self.width, self.height, |x, y| Luma([self.value(x, y)]));
        let resized = imageops::resize(&source, width, height, FilterType::Triangle);

        SoftMask {
            width,
            height,
            values: resized.into_raw(),
            score: self.score,
        }
    }

    pub(crate) fn binarize(&self, threshold: f32) -> Option<BinaryMask> {
        let mut bits = vec![false; self.values.len()];
        let mut bounds: Option<Bounds> = None;
        let mut soft_sum = 0.0f64;

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y as usize * self.width as usize + x as usize;
                let value = self.values[idx];
                if value > threshold {
                    bits[idx] = true;
                    soft_sum += value as f64;
                    match bounds.as_mut() {
                        Some(b) => b.include(x, y),
                        None => bounds = Some(Bounds::start(x, y)),
                    }
                }
            }
        }

        let bounds = bounds?;
        Some(BinaryMask {
            width: self.width,
            bits,
            bbox: bounds.to_box(),
            area: bounds.count,
            mean_value: (soft_sum / bounds.count as f64) as f32,
        })
    }
}

/// Thresholded mask with at least one set pixel.
#[derive(Debug, Clone)]
pub(crate) struct BinaryMask {
    width: u32,
    bits: Vec<bool>,
    pub(crate) bbox: PixelBox,
    pub(crate) area: u64,
    pub(crate) mean_value: f32,
}

impl BinaryMask {
    fn is_set(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }
}

/// Shared pixels divided by the smaller mask's area.
pub(crate) fn overlap_ratio(a: &BinaryMask, b: &BinaryMask) -> f64 {
    let smaller = a.area.min(b.area);
    if smaller == 0 {
        return 0.0;
    }
    let Some(window) = a.bbox.intersect(&b.bbox) else {
        return 0.0;
    };

    let mut shared = 0u64;
    for y in window.y1..window.y2 {
        for x in window.x1..window.x2 {
            if a.is_set(x, y) && b.is_set(x, y) {
                shared += 1;
            }
        }
    }

    shared as f64 / smaller as f64
}

struct MaskCandidate {
    index: usize,
    mask: BinaryMask,
    score: Option<f32>,
}

/// Size filter, then largest-first overlap suppression.
pub(crate) fn extract_from_masks(
    masks: &[SoftMask],
    image_width: u32,
    image_height: u32,
    config: &ExtractionConfig,
    observer: &mut dyn ExtractionObserver,
) -> Vec<Region> {
    let mut candidates = Vec::with_capacity(masks.len());

    for (index, mask) in masks.iter().enumerate() {
        let resized = mask.resized(image_width, image_height);
        let Some(binary) = resized.binarize(config.mask_threshold) else {
            observer.region_rejected(Candidate::Mask(index), &RejectReason::Empty);
            continue;
        };

        let (width_ratio, height_ratio) = binary.bbox.size_ratios(image_width, image_height);
        if width_ratio > config.max_size_ratio || height_ratio > config.max_size_ratio {
            observer.region_rejected(
                Candidate::Mask(index),
                &RejectReason::Oversized { width_ratio, height_ratio },
            );
            continue;
        }

        candidates.push(MaskCandidate {
            index,
            mask: binary,
            score: mask.score(),
        });
    }

    // Stable: equal areas keep the caller's order
    candidates.sort_by(|a, b| b.mask.area.cmp(&a.mask.area));

    let mut kept: Vec<MaskCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressor = kept.iter().find_map(|larger| {
            let overlap = overlap_ratio(&larger.mask, &candidate.mask);
            (overlap >= config.overlap_threshold).then_some((larger.index, overlap))
        });

        match suppressor {
            Some((kept_index, overlap)) => observer.region_rejected(
                Candidate::Mask(candidate.index),
                &RejectReason::Overlapping { kept_index, overlap },
            ),
            None => kept.push(candidate),
        }
    }

    kept.into_iter()
        .map(|candidate| {
            let confidence = candidate.score.unwrap_or(candidate.mask.mean_value);
            let region = Region::new(
                candidate.mask.bbox,
                candidate.mask.area,
                RegionSignal::Confidence(confidence),
                Some(candidate.index),
                image_width,
                image_height,
            );
            observer.region_accepted(&region);
            region
        })
        .collect()
}
