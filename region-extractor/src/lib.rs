//! Region extraction for floorplan furniture detection.
//!
//! Two input modes share one output shape:
//! - mask mode filters soft segmentation masks by size, then suppresses smaller
//!   masks that are mostly covered by a larger one
//! - color mode flood-fills colored blobs directly out of a rendered image
//!
//! Extraction is pure: no I/O, no global state. Callers that want logging or
//! debug images pass an [`ExtractionObserver`].

use image::RgbImage;

mod config;
mod error;
mod flood_fill;
mod geometry;
mod mask;
mod observer;
mod region;

pub use config::{ExtractionConfig, MAX_NEIGHBOR_RADIUS};
pub use error::{ExtractError, Result};
pub use flood_fill::is_background;
pub use geometry::{NormalizedBox, PixelBox, Rgb};
pub use mask::SoftMask;
pub use observer::{
    Candidate, DebugImageWriter, ExtractionObserver, NoopObserver, RejectReason, TracingObserver,
};
pub use region::{
    DetectionSet, Dimensions, ExtractionMode, Position, Region, RegionRecord, RegionSignal,
};

/// Extract regions from a decoded image.
///
/// With `masks` the regions come from the masks (mask mode); without, they are
/// flood-filled from the image's own colors (color mode).
pub fn extract_regions(
    image: &RgbImage,
    masks: Option<&[SoftMask]>,
    config: &ExtractionConfig,
) -> Result<DetectionSet> {
    extract_regions_with_observer(image, masks, config, &mut NoopObserver)
}

/// Same as [`extract_regions`], reporting each decision to `observer`.
pub fn extract_regions_with_observer(
    image: &RgbImage,
    masks: Option<&[SoftMask]>,
    config: &ExtractionConfig,
    observer: &mut dyn ExtractionObserver,
) -> Result<DetectionSet> {
    config.validate()?;

    let (width, height) = image.dimensions();
    let (mode, regions) = match masks {
        _ if width == 0 || height == 0 => (mode_for(masks), Vec::new()),
        Some(masks) => (
            ExtractionMode::Mask,
            mask::extract_from_masks(masks, width, height, config, observer),
        ),
        None => (
            ExtractionMode::Color,
            flood_fill::extract_from_colors(image, config, observer),
        ),
    };

    let detections = DetectionSet {
        mode,
        image_width: width,
        image_height: height,
        regions,
    };
    observer.finished(image, &detections);

    Ok(detections)
}

/// Decode an encoded image buffer and extract regions from it.
pub fn extract_regions_from_bytes(
    bytes: &[u8],
    masks: Option<&[SoftMask]>,
    config: &ExtractionConfig,
    observer: &mut dyn ExtractionObserver,
) -> Result<DetectionSet> {
    // Bad thresholds fail before paying for the decode
    config.validate()?;
    let image = decode_image(bytes)?;
    extract_regions_with_observer(&image, masks, config, observer)
}

/// Decode any supported format into 8-bit RGB, dropping alpha.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

fn mode_for(masks: Option<&[SoftMask]>) -> ExtractionMode {
    if masks.is_some() {
        ExtractionMode::Mask
    } else {
        ExtractionMode::Color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]))
    }

    fn fill(img: &mut RgbImage, x1: u32, y1: u32, x2: u32, y2: u32, color: [u8; 3]) {
        for y in y1..y2 {
            for x in x1..x2 {
                img.put_pixel(x, y, image::Rgb(color));
            }
        }
    }

    fn rect_mask(x1: u32, y1: u32, x2: u32, y2: u32) -> SoftMask {
        let mut values = vec![0.0; 100 * 100];
        for y in y1..y2 {
            for x in x1..x2 {
                values[(y * 100 + x) as usize] = 1.0;
            }
        }
        SoftMask::new(100, 100, values).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        rejected: Vec<(Candidate, RejectReason)>,
        accepted: usize,
        finished: usize,
    }

    impl ExtractionObserver for Recorder {
        fn region_rejected(&mut self, candidate: Candidate, reason: &RejectReason) {
            self.rejected.push((candidate, reason.clone()));
        }

        fn region_accepted(&mut self, _region: &Region) {
            self.accepted += 1;
        }

        fn finished(&mut self, _image: &RgbImage, _detections: &DetectionSet) {
            self.finished += 1;
        }
    }

    #[test]
    fn test_all_white_image_has_no_regions() {
        let detections = extract_regions(&white(100, 100), None, &ExtractionConfig::default()).unwrap();
        assert!(detections.is_empty());
        assert_eq!(detections.mode, ExtractionMode::Color);
    }

    #[test]
    fn test_background_only_image_has_no_regions() {
        // Line art and gray fills are all background
        let mut img = white(100, 100);
        fill(&mut img, 10, 10, 90, 12, [0, 0, 0]);
        fill(&mut img, 20, 30, 50, 60, [128, 128, 128]);
        fill(&mut img, 60, 30, 80, 60, [240, 235, 230]);

        let detections = extract_regions(&img, None, &ExtractionConfig::default()).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_single_red_square() {
        let mut img = white(100, 100);
        fill(&mut img, 40, 40, 60, 60, [255, 0, 0]);

        let detections = extract_regions(&img, None, &ExtractionConfig::default()).unwrap();

        assert_eq!(detections.len(), 1);
        let region = &detections.regions[0];
        assert_eq!(region.bbox, PixelBox { x1: 40, y1: 40, x2: 60, y2: 60 });
        assert_eq!(region.area, 400);
        assert_eq!(region.color(), Some(Rgb::new(255, 0, 0)));
        assert!(!is_background(region.color().unwrap(), &ExtractionConfig::default()));
    }

    #[test]
    fn test_nearly_identical_masks_keep_first() {
        // Same 30x30 area, shifted 3 pixels: 90% overlap
        let masks = vec![rect_mask(10, 10, 40, 40), rect_mask(13, 10, 43, 40)];

        let detections = extract_regions(&white(100, 100), Some(masks.as_slice()), &ExtractionConfig::default()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections.regions[0].mask_index, Some(0));
        assert_eq!(detections.mode, ExtractionMode::Mask);
    }

    #[test]
    fn test_tie_break_follows_input_index() {
        let masks = vec![rect_mask(13, 10, 43, 40), rect_mask(10, 10, 40, 40)];

        let detections = extract_regions(&white(100, 100), Some(masks.as_slice()), &ExtractionConfig::default()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections.regions[0].bbox.x1, 13);
    }

    #[test]
    fn test_wide_mask_is_excluded() {
        // 60% of the image width
        let masks = vec![rect_mask(10, 10, 70, 20), rect_mask(80, 80, 90, 90)];

        let mut recorder = Recorder::default();
        let detections = extract_regions_with_observer(
            &white(100, 100),
            Some(masks.as_slice()),
            &ExtractionConfig::default(),
            &mut recorder,
        )
        .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections.regions[0].mask_index, Some(1));
        assert!(matches!(
            recorder.rejected[0],
            (Candidate::Mask(0), RejectReason::Oversized { .. })
        ));
    }

    #[test]
    fn test_tall_mask_is_excluded() {
        // 60% of the image height, narrow
        let masks = vec![rect_mask(10, 10, 20, 70)];

        let mut recorder = Recorder::default();
        let detections = extract_regions_with_observer(
            &white(100, 100),
            Some(masks.as_slice()),
            &ExtractionConfig::default(),
            &mut recorder,
        )
        .unwrap();

        assert!(detections.is_empty());
        match &recorder.rejected[0] {
            (Candidate::Mask(0), RejectReason::Oversized { width_ratio, height_ratio }) => {
                assert!((width_ratio - 0.1).abs() < 1e-9);
                assert!((height_ratio - 0.6).abs() < 1e-9);
            }
            other => panic!("unexpected rejection {:?}", other),
        }
    }

    #[test]
    fn test_mask_at_exact_size_ratio_is_kept() {
        let masks = vec![rect_mask(10, 10, 60, 20), rect_mask(30, 40, 40, 90)];

        let detections = extract_regions(&white(100, 100), Some(masks.as_slice()), &ExtractionConfig::default()).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections.regions[0].bbox.width(), 50);
        assert_eq!(detections.regions[1].bbox.height(), 50);
    }

    #[test]
    fn test_oversized_mask_excluded_even_if_largest() {
        // The oversized mask would otherwise suppress the one it contains
        let masks = vec![rect_mask(0, 0, 60, 30), rect_mask(5, 5, 25, 25)];

        let detections = extract_regions(&white(100, 100), Some(masks.as_slice()), &ExtractionConfig::default()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections.regions[0].mask_index, Some(1));
    }

    #[test]
    fn test_contained_mask_is_suppressed() {
        let masks = vec![rect_mask(30, 30, 35, 35), rect_mask(20, 20, 50, 50)];

        let mut recorder = Recorder::default();
        let detections = extract_regions_with_observer(
            &white(100, 100),
            Some(masks.as_slice()),
            &ExtractionConfig::default(),
            &mut recorder,
        )
        .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections.regions[0].mask_index, Some(1));
        assert_eq!(recorder.accepted, 1);
        assert_eq!(recorder.finished, 1);
        match &recorder.rejected[0] {
            (Candidate::Mask(0), RejectReason::Overlapping { kept_index, overlap }) => {
                assert_eq!(*kept_index, 1);
                assert!((overlap - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected rejection {:?}", other),
        }
    }

    #[test]
    fn test_overlap_exactly_at_threshold_is_suppressed() {
        // Smaller mask has 10x10 = 100 pixels, 50 of them inside the larger one
        let masks = vec![rect_mask(10, 10, 40, 40), rect_mask(35, 20, 45, 30)];

        let detections = extract_regions(&white(100, 100), Some(masks.as_slice()), &ExtractionConfig::default()).unwrap();
        assert_eq!(detections.len(), 1);

        let lenient = ExtractionConfig { overlap_threshold: 0.6, ..Default::default() };
        let detections = extract_regions(&white(100, 100), Some(masks.as_slice()), &lenient).unwrap();
        assert_eq!(detections.len(), 2);
    }

    #[test]
    fn test_touching_same_color_objects_merge() {
        let mut img = white(100, 100);
        fill(&mut img, 20, 20, 40, 40, [0, 120, 255]);
        fill(&mut img, 40, 20, 60, 40, [10, 125, 250]);

        let detections = extract_regions(&img, None, &ExtractionConfig::default()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections.regions[0].bbox, PixelBox { x1: 20, y1: 20, x2: 60, y2: 40 });
    }

    #[test]
    fn test_distinct_colors_stay_separate_and_sorted() {
        let mut img = white(100, 100);
        fill(&mut img, 5, 5, 20, 20, [255, 0, 0]);
        fill(&mut img, 50, 50, 80, 80, [0, 0, 255]);
        // Touches the blue block but is far outside the tolerance
        fill(&mut img, 80, 50, 95, 65, [0, 200, 0]);

        let detections = extract_regions(&img, None, &ExtractionConfig::default()).unwrap();

        // Red and green tie on area; red was discovered first in raster order
        let colors: Vec<_> = detections.iter().map(|r| r.color().unwrap()).collect();
        assert_eq!(
            colors,
            vec![Rgb::new(0, 0, 255), Rgb::new(255, 0, 0), Rgb::new(0, 200, 0)]
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let mut img = white(100, 100);
        fill(&mut img, 10, 10, 30, 30, [255, 0, 0]);
        fill(&mut img, 60, 10, 90, 40, [0, 160, 60]);
        let masks = vec![rect_mask(10, 10, 30, 30), rect_mask(15, 15, 25, 25), rect_mask(60, 60, 75, 90)];
        let config = ExtractionConfig::default();

        assert_eq!(
            extract_regions(&img, None, &config).unwrap(),
            extract_regions(&img, None, &config).unwrap()
        );
        assert_eq!(
            extract_regions(&img, Some(masks.as_slice()), &config).unwrap(),
            extract_regions(&img, Some(masks.as_slice()), &config).unwrap()
        );
    }

    #[test]
    fn test_empty_mask_list_yields_empty_set() {
        let detections = extract_regions(&white(50, 50), Some(&[][..]), &ExtractionConfig::default()).unwrap();
        assert!(detections.is_empty());
        assert_eq!(detections.mode, ExtractionMode::Mask);
    }

    #[test]
    fn test_invalid_config_fails_before_processing() {
        let config = ExtractionConfig { neighbor_radius: 0, ..Default::default() };
        let mut recorder = Recorder::default();

        let result = extract_regions_with_observer(&white(10, 10), None, &config, &mut recorder);

        assert!(matches!(result, Err(ExtractError::Configuration(_))));
        assert_eq!(recorder.finished, 0);
    }

    #[test]
    fn test_undecodable_bytes() {
        let result = extract_regions_from_bytes(
            b"definitely not an image",
            None,
            &ExtractionConfig::default(),
            &mut NoopObserver,
        );
        assert!(matches!(result, Err(ExtractError::Decode(_))));
    }

    #[test]
    fn test_extract_from_encoded_png() {
        let mut img = white(100, 100);
        fill(&mut img, 40, 40, 60, 60, [255, 0, 0]);
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let detections =
            extract_regions_from_bytes(&bytes, None, &ExtractionConfig::default(), &mut NoopObserver)
                .unwrap();

        assert_eq!(detections.len(), 1);
        let records = detections.to_records();
        assert_eq!(records[0].id, "obj_1");
        assert!((records[0].position.x - 0.5).abs() < 1e-9);
    }
}
