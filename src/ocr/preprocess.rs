//! Image preparation applied before text recognition.

use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// A rectangle in relative coordinates (0.0 to 1.0).
/// Used for defining report regions that scale with the captured window size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of image width
    pub width: f32,
    /// Height as fraction of image height
    pub height: f32,
}

impl Default for RelativeRect {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Converts an image to binary by keeping only dark pixels.
///
/// Pixels where R, G and B are all below the threshold become black (text),
/// everything else becomes white (background). Lab report panels are dark
/// text on a light surface, so this isolates the table text from panel
/// borders and shading.
pub fn threshold_dark_pixels(img: &RgbaImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let Rgba([r, g, b, _]) = *pixel;
        let value = if r < threshold && g < threshold && b < threshold {
            0u8 // Black (text)
        } else {
            255u8 // White (background)
        };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Cuts the report region out of a capture using relative coordinates.
///
/// Converts the relative rect (0.0–1.0) to absolute pixel coordinates,
/// clamped to the capture bounds, and returns the cropped sub-image.
pub fn crop_region(img: &RgbaImage, region: &RelativeRect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = ((region.x * w as f32) as u32).min(w);
    let y0 = ((region.y * h as f32) as u32).min(h);
    let rw = ((region.width * w as f32) as u32).min(w - x0);
    let rh = ((region.height * h as f32) as u32).min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}
