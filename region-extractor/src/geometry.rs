use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel space. `x2` and `y2` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelBox {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Overlapping window of two boxes, if any.
    pub fn intersect(&self, other: &PixelBox) -> Option<PixelBox> {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x1 < x2 && y1 < y2 {
            Some(PixelBox { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    /// Width and height as fractions of the image dimensions.
    pub fn size_ratios(&self, image_width: u32, image_height: u32) -> (f64, f64) {
        (
            self.width() as f64 / image_width.max(1) as f64,
            self.height() as f64 / image_height.max(1) as f64,
        )
    }

    pub fn normalized(&self, image_width: u32, image_height: u32) -> NormalizedBox {
        let w = image_width.max(1) as f64;
        let h = image_height.max(1) as f64;
        NormalizedBox {
            x1: self.x1 as f64 / w,
            y1: self.y1 as f64 / h,
            x2: self.x2 as f64 / w,
            y2: self.y2 as f64 / h,
        }
    }
}

/// Box in the 0-1 image coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl NormalizedBox {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Width over height; 1.0 for degenerate boxes.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height() > 0.0 {
            self.width() / self.height()
        } else {
            1.0
        }
    }
}

/// Running bounds and pixel count of a growing region.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pub(crate) count: u64,
}

impl Bounds {
    pub(crate) fn start(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            count: 1,
        }
    }

    pub(crate) fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.count += 1;
    }

    pub(crate) fn to_box(self) -> PixelBox {
        PixelBox {
            x1: self.min_x,
            y1: self.min_y,
            x2: self.max_x + 1,
            y2: self.max_y + 1,
        }
    }
}

/// 8-bit RGB color as reported on color-mode regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Sum of per-channel absolute differences.
    pub fn distance(&self, other: &Rgb) -> u32 {
        self.r.abs_diff(other.r) as u32
            + self.g.abs_diff(other.g) as u32
            + self.b.abs_diff(other.b) as u32
    }

    /// Difference between the largest and smallest channel.
    pub fn spread(&self) -> u8 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        max - min
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(pixel: image::Rgb<u8>) -> Self {
        Rgb::new(pixel[0], pixel[1], pixel[2])
    }
}

impl From<&image::Rgb<u8>> for Rgb {
    fn from(pixel: &image::Rgb<u8>) -> Self {
        Rgb::new(pixel[0], pixel[1], pixel[2])
    }
}
