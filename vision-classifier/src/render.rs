use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use region_extractor::{PixelBox, SoftMask};

const HIGHLIGHT_FILL: Rgb<u8> = Rgb([255, 100, 0]);
const HIGHLIGHT_BORDER: Rgb<u8> = Rgb([255, 0, 0]);
const HIGHLIGHT_ALPHA: f32 = 0.3;
const BORDER_THICKNESS: u32 = 3;

/// Grow a box by `fraction` of its size on every side, clamped to the image.
pub fn pad_box(bbox: &PixelBox, fraction: f64, image_width: u32, image_height: u32) -> PixelBox {
    let pad_x = (bbox.width() as f64 * fraction) as u32;
    let pad_y = (bbox.height() as f64 * fraction) as u32;
    PixelBox {
        x1: bbox.x1.saturating_sub(pad_x),
        y1: bbox.y1.saturating_sub(pad_y),
        x2: (bbox.x2 + pad_x).min(image_width),
        y2: (bbox.y2 + pad_y).min(image_height),
    }
}

/// Copy of the full image with one region tinted orange and outlined in red.
///
/// The tint covers the box padded by 10%; the border sits just inside it.
pub fn highlight_region(image: &RgbImage, bbox: &PixelBox) -> RgbImage {
    let (width, height) = image.dimensions();
    let area = pad_box(bbox, 0.1, width, height);
    let mut canvas = image.clone();
    if area.width() == 0 || area.height() == 0 {
        return canvas;
    }

    for y in area.y1..area.y2 {
        for x in area.x1..area.x2 {
            let pixel = canvas.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = HIGHLIGHT_FILL[c] as f32 * HIGHLIGHT_ALPHA
                    + pixel[c] as f32 * (1.0 - HIGHLIGHT_ALPHA);
                pixel[c] = blended.round() as u8;
            }
        }
    }

    for inset in 0..BORDER_THICKNESS {
        let w = area.width().saturating_sub(inset * 2);
        let h = area.height().saturating_sub(inset * 2);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((area.x1 + inset) as i32, (area.y1 + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut canvas, rect, HIGHLIGHT_BORDER);
    }

    canvas
}

/// Cut a region out of the image with `padding` pixels of context.
///
/// With a mask, pixels the mask doesn't cover are painted white so only the
/// object itself remains.
pub fn crop_region(
    image: &RgbImage,
    bbox: &PixelBox,
    mask: Option<&SoftMask>,
    padding: u32,
) -> RgbImage {
    let (width, height) = image.dimensions();
    let area = PixelBox {
        x1: bbox.x1.saturating_sub(padding),
        y1: bbox.y1.saturating_sub(padding),
        x2: (bbox.x2 + padding).min(width),
        y2: (bbox.y2 + padding).min(height),
    };

    let mask = mask.map(|m| m.resized(width, height));
    RgbImage::from_fn(area.width(), area.height(), |x, y| {
        let (sx, sy) = (area.x1 + x, area.y1 + y);
        match &mask {
            Some(m) if m.value(sx, sy) <= 0.5 => Rgb([255, 255, 255]),
            _ => *image.get_pixel(sx, sy),
        }
    })
}

pub fn encode_jpeg(image: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone()).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
    Ok(bytes)
}

/// JPEG as a `data:` URI, the form the vision API accepts inline.
pub fn jpeg_data_uri(image: &RgbImage) -> anyhow::Result<String> {
    let bytes = encode_jpeg(image)?;
    Ok(format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(bytes)
    ))
}
