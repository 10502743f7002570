//! Text recognition engine interface and the Tesseract-backed implementation.
//!
//! The rest of the crate only depends on the `TextRecognizer` trait; the
//! Tesseract subprocess recognizer here turns its TSV output into positioned
//! text blocks.

use anyhow::{anyhow, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tempfile::NamedTempFile;

use super::preprocess::threshold_dark_pixels;

/// One fragment of recognized text with its position and confidence.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// Corner points of the bounding quadrilateral, clockwise from top-left.
    /// Nominally 4 points; consumers must tolerate malformed boxes.
    pub box_points: Vec<(f32, f32)>,
    pub text: String,
    pub confidence: f32,
}

impl TextBlock {
    /// Builds a block from an axis-aligned rectangle.
    pub fn from_rect(
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        text: &str,
        confidence: f32,
    ) -> Self {
        Self {
            box_points: vec![
                (left, top),
                (left + width, top),
                (left + width, top + height),
                (left, top + height),
            ],
            text: text.to_string(),
            confidence,
        }
    }
}

/// Source of recognized text blocks for an image region.
///
/// A failure (`Err`) means the engine itself was unavailable or the image
/// could not be processed; "no text found" is `Ok` with an empty vector.
pub trait TextRecognizer {
    fn recognize(&self, img: &RgbaImage) -> Result<Vec<TextBlock>>;
}

/// Tesseract recognizer running the system `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    /// Language model, e.g. "deu" for German lab reports.
    pub language: String,
    /// Page segmentation mode passed via `--psm`.
    pub psm: u8,
    /// Optional binarization threshold applied before recognition.
    /// Pixels darker than this on all channels are kept as text.
    pub binarize_threshold: Option<u8>,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            language: "deu".to_string(),
            psm: 6,
            binarize_threshold: None,
        }
    }
}

impl TesseractRecognizer {
    /// Builds a recognizer with the OCR settings from the pipeline config.
    pub fn from_config(config: &crate::config::PipelineConfig) -> Self {
        Self {
            language: config.ocr_language.clone(),
            psm: config.ocr_psm,
            binarize_threshold: config.ocr_threshold,
        }
    }
}

/// Locates the tesseract executable once per process and caches the result.
///
/// Honors the TESSERACT_CMD environment variable, otherwise expects
/// `tesseract` on PATH.
fn tesseract_executable() -> Result<&'static Path> {
    static EXECUTABLE: OnceLock<PathBuf> = OnceLock::new();
    if let Some(path) = EXECUTABLE.get() {
        return Ok(path);
    }
    let candidate = match std::env::var_os("TESSERACT_CMD") {
        Some(cmd) => PathBuf::from(cmd),
        None => PathBuf::from("tesseract"),
    };
    // Probe with --version so engine unavailability surfaces here, not as a
    // recognition failure later.
    Command::new(&candidate)
        .arg("--version")
        .output()
        .map_err(|e| anyhow!("Tesseract not available at {:?}: {}", candidate, e))?;
    Ok(EXECUTABLE.get_or_init(|| candidate))
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, img: &RgbaImage) -> Result<Vec<TextBlock>> {
        let exe = tesseract_executable()?;

        let temp_input = NamedTempFile::with_suffix(".png")?;
        match self.binarize_threshold {
            Some(t) => threshold_dark_pixels(img, t).save(temp_input.path())?,
            None => image::imageops::grayscale(img).save(temp_input.path())?,
        }

        // Tesseract appends .tsv to the output base itself.
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = Command::new(exe)
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content))
    }
}

/// Parses Tesseract TSV rows into text blocks.
///
/// Only word rows (level 5) with non-empty text and a usable confidence are
/// kept; each becomes one block with a rectangular bounding quadrilateral.
fn parse_tsv_output(tsv: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();

    for line in tsv.lines().skip(1) {
        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if conf < 0.0 {
            continue;
        }

        let (left, top, width, height) = match (
            fields[6].parse::<f32>(),
            fields[7].parse::<f32>(),
            fields[8].parse::<f32>(),
            fields[9].parse::<f32>(),
        ) {
            (Ok(l), Ok(t), Ok(w), Ok(h)) => (l, t, w, h),
            _ => {
                log::warn!("Skipping TSV row with unparsable geometry: {}", line);
                continue;
            }
        };

        blocks.push(TextBlock::from_rect(left, top, width, height, text, conf));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV_HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv_row(level: i32, left: f32, top: f32, w: f32, h: f32, conf: f32, text: &str) -> String {
        format!(
            "{}\t1\t1\t1\t1\t1\t{}\t{}\t{}\t{}\t{}\t{}",
            level, left, top, w, h, conf, text
        )
    }

    #[test]
    fn test_parse_tsv_words_only() {
        let tsv = format!(
            "{}\n{}\n{}\n{}",
            TSV_HEADER,
            tsv_row(4, 0.0, 0.0, 100.0, 20.0, -1.0, ""), // line-level row, skipped
            tsv_row(5, 10.0, 5.0, 60.0, 12.0, 91.0, "Leukozyten"),
            tsv_row(5, 120.0, 5.0, 24.0, 12.0, 88.0, "3.6"),
        );
        let blocks = parse_tsv_output(&tsv);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Leukozyten");
        assert_eq!(blocks[0].box_points.len(), 4);
        assert_eq!(blocks[0].box_points[0], (10.0, 5.0));
        assert_eq!(blocks[0].box_points[2], (70.0, 17.0));
        assert_eq!(blocks[1].text, "3.6");
    }

    #[test]
    fn test_parse_tsv_skips_empty_and_negative_conf() {
        let tsv = format!(
            "{}\n{}\n{}",
            TSV_HEADER,
            tsv_row(5, 0.0, 0.0, 10.0, 10.0, -1.0, "ghost"),
            tsv_row(5, 0.0, 0.0, 10.0, 10.0, 80.0, "  "),
        );
        assert!(parse_tsv_output(&tsv).is_empty());
    }

    #[test]
    fn test_parse_tsv_empty_input() {
        assert!(parse_tsv_output("").is_empty());
        assert!(parse_tsv_output(TSV_HEADER).is_empty());
    }

    #[test]
    fn test_from_config_takes_ocr_settings() {
        let config = crate::config::PipelineConfig {
            ocr_language: "eng".to_string(),
            ocr_psm: 4,
            ocr_threshold: Some(120),
            ..crate::config::PipelineConfig::default()
        };
        let recognizer = TesseractRecognizer::from_config(&config);
        assert_eq!(recognizer.language, "eng");
        assert_eq!(recognizer.psm, 4);
        assert_eq!(recognizer.binarize_threshold, Some(120));
    }

    #[test]
    fn test_from_rect_corners() {
        let b = TextBlock::from_rect(1.0, 2.0, 3.0, 4.0, "x", 50.0);
        assert_eq!(
            b.box_points,
            vec![(1.0, 2.0), (4.0, 2.0), (4.0, 6.0), (1.0, 6.0)]
        );
    }
}
