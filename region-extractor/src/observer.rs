use std::path::PathBuf;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::region::{DetectionSet, ExtractionMode};

/// What was under consideration when a candidate got dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Index into the caller's mask list
    Mask(usize),
    /// Seed pixel of a flood-filled color region
    Seed { x: u32, y: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// No mask pixel above the binarization threshold
    Empty,
    /// Bounding box spans too much of the image
    Oversized { width_ratio: f64, height_ratio: f64 },
    /// Bounding box is under the minimum side length
    TooSmall { width: u32, height: u32 },
    /// Covered by a larger mask that was already kept
    Overlapping { kept_index: usize, overlap: f64 },
}

/// Hooks into an extraction run. All methods default to no-ops.
pub trait ExtractionObserver {
    fn region_rejected(&mut self, _candidate: Candidate, _reason: &RejectReason) {}

    fn region_accepted(&mut self, _region: &crate::Region) {}

    fn finished(&mut self, _image: &RgbImage, _detections: &DetectionSet) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExtractionObserver for NoopObserver {}

/// Emits one `tracing` event per decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExtractionObserver for TracingObserver {
    fn region_rejected(&mut self, candidate: Candidate, reason: &RejectReason) {
        match reason {
            RejectReason::Oversized { width_ratio, height_ratio } => debug!(
                ?candidate,
                "Filtering region: too large (width: {:.1}%, height: {:.1}%)",
                width_ratio * 100.0,
                height_ratio * 100.0
            ),
            RejectReason::Overlapping { kept_index, overlap } => debug!(
                ?candidate,
                "Filtering region: overlaps with mask {} by {:.1}%",
                kept_index,
                overlap * 100.0
            ),
            RejectReason::TooSmall { width, height } => {
                debug!(?candidate, "Filtering region: too small ({}x{})", width, height)
            }
            RejectReason::Empty => debug!(?candidate, "Filtering region: empty mask"),
        }
    }

    fn region_accepted(&mut self, region: &crate::Region) {
        debug!(
            bbox = ?region.bbox,
            area = region.area,
            "Accepted region"
        );
    }

    fn finished(&mut self, image: &RgbImage, detections: &DetectionSet) {
        debug!(
            "Extracted {} regions ({:?} mode) from {}x{} image",
            detections.len(),
            detections.mode,
            image.width(),
            image.height()
        );
    }
}

/// Writes a copy of each processed image with region boxes drawn on it.
///
/// Failures to write are logged and swallowed; extraction results never depend on this.
#[derive(Debug, Clone)]
pub struct DebugImageWriter {
    output_dir: PathBuf,
    written: usize,
}

impl DebugImageWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            written: 0,
        }
    }

    /// Number of images written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn render(image: &RgbImage, detections: &DetectionSet) -> RgbImage {
        let mut canvas = image.clone();
        let outline = match detections.mode {
            ExtractionMode::Mask => Rgb([255u8, 100, 0]),
            ExtractionMode::Color => Rgb([0u8, 160, 255]),
        };

        for region in detections {
            let rect = Rect::at(region.bbox.x1 as i32, region.bbox.y1 as i32)
                .of_size(region.bbox.width().max(1), region.bbox.height().max(1));
            draw_hollow_rect_mut(&mut canvas, rect, outline);
        }

        canvas
    }
}

impl ExtractionObserver for DebugImageWriter {
    fn finished(&mut self, image: &RgbImage, detections: &DetectionSet) {
        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            warn!("Failed to create debug directory {:?}: {}", self.output_dir, e);
            return;
        }

        let path = self
            .output_dir
            .join(format!("{:02}_regions.png", self.written + 1));
        match Self::render(image, detections).save(&path) {
            Ok(()) => {
                self.written += 1;
                debug!("Saved debug image: {:?}", path);
            }
            Err(e) => warn!("Failed to save debug image {:?}: {}", path, e),
        }
    }
}
