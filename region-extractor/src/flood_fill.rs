use image::RgbImage;
use std::collections::VecDeque;

use crate::config::ExtractionConfig;
use crate::geometry::{Bounds, Rgb};
use crate::observer::{Candidate, ExtractionObserver, RejectReason};
use crate::region::{Region, RegionSignal};

/// Grayscale, near-black and near-white pixels never start a region.
pub fn is_background(color: Rgb, config: &ExtractionConfig) -> bool {
    let near_black = color.r <= config.near_black
        && color.g <= config.near_black
        && color.b <= config.near_black;
    let near_white = color.r >= config.near_white
        && color.g >= config.near_white
        && color.b >= config.near_white;

    near_black || near_white || color.spread() < config.grayscale_spread
}

/// Flood-fill colored regions straight out of a rendered image.
///
/// Scans in raster order and grows a region from every unvisited, non-background
/// pixel. Neighbours are searched in a square window of `neighbor_radius` and are
/// compared against the seed color, not the pixel they were reached from.
pub(crate) fn extract_from_colors(
    img: &RgbImage,
    config: &ExtractionConfig,
    observer: &mut dyn ExtractionObserver,
) -> Vec<Region> {
    let (width, height) = img.dimensions();
    let mut visited = vec![false; width as usize * height as usize];
    let mut regions = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = (y as usize * width as usize) + x as usize;
            if visited[idx] {
                continue;
            }

            let seed = Rgb::from(img.get_pixel(x, y));
            if is_background(seed, config) {
                continue;
            }

            let bounds = grow_region(img, x, y, seed, &mut visited, config);
            let bbox = bounds.to_box();

            if bbox.width() < config.min_region_side || bbox.height() < config.min_region_side {
                observer.region_rejected(
                    Candidate::Seed { x, y },
                    &RejectReason::TooSmall {
                        width: bbox.width(),
                        height: bbox.height(),
                    },
                );
                continue;
            }

            let (width_ratio, height_ratio) = bbox.size_ratios(width, height);
            if width_ratio > config.max_size_ratio || height_ratio > config.max_size_ratio {
                observer.region_rejected(
                    Candidate::Seed { x, y },
                    &RejectReason::Oversized { width_ratio, height_ratio },
                );
                continue;
            }

            regions.push(Region::new(
                bbox,
                bounds.count,
                RegionSignal::Color(seed),
                None,
                width,
                height,
            ));
        }
    }

    // Stable: equal areas keep raster discovery order
    regions.sort_by(|a, b| b.area.cmp(&a.area));
    for region in &regions {
        observer.region_accepted(region);
    }

    regions
}

fn grow_region(
    img: &RgbImage,
    start_x: u32,
    start_y: u32,
    seed: Rgb,
    visited: &mut [bool],
    config: &ExtractionConfig,
) -> Bounds {
    let (width, height) = img.dimensions();
    let radius = config.neighbor_radius;
    let mut queue = VecDeque::new();
    let mut bounds = Bounds::start(start_x, start_y);

    queue.push_back((start_x, start_y));
    visited[(start_y as usize * width as usize) + start_x as usize] = true;

    while let Some((x, y)) = queue.pop_front() {
        // Window clipped to the image
        let (min_x, max_x) = (x.saturating_sub(radius), x.saturating_add(radius).min(width - 1));
        let (min_y, max_y) = (y.saturating_sub(radius), y.saturating_add(radius).min(height - 1));

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                if px == x && py == y {
                    continue;
                }
                let nidx = (py as usize * width as usize) + px as usize;
                if visited[nidx] {
                    continue;
                }
                if seed.distance(&Rgb::from(img.get_pixel(px, py))) < config.color_tolerance {
                    visited[nidx] = true;
                    bounds.include(px, py);
                    queue.push_back((px, py));
                }
            }
        }
    }

    bounds
}
