pub mod engine;
pub mod extract;
pub mod group;
pub mod preprocess;

pub use engine::{TesseractRecognizer, TextBlock, TextRecognizer};
pub use extract::{extract_value, parse_value};
pub use group::group_lines;
pub use preprocess::{crop_region, threshold_dark_pixels, RelativeRect};

use anyhow::Result;
use image::RgbaImage;

use crate::config::PipelineConfig;

/// High-level helper: captured image → formatted report lines.
///
/// Crops the configured report region, recognizes it with a Tesseract
/// recognizer built from the config, filters low-confidence blocks, and
/// groups the rest into lines.
pub fn recognize_report_lines(img: &RgbaImage, config: &PipelineConfig) -> Result<Vec<String>> {
    let region = crop_region(img, &config.report_region);
    let recognizer = TesseractRecognizer::from_config(config);
    let blocks = recognizer.recognize(&region)?;
    let kept: Vec<TextBlock> = blocks
        .into_iter()
        .filter(|b| b.confidence >= config.min_confidence)
        .collect();
    Ok(group_lines(&kept, config.y_tolerance, config.gap_threshold))
}
