//! Pipeline tuning parameters.
//!
//! Loaded from a JSON file when present, otherwise defaulted. Every field
//! has a serde default so a partial config file stays valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ocr::group::{DEFAULT_GAP_THRESHOLD, DEFAULT_Y_TOLERANCE};
use crate::ocr::preprocess::RelativeRect;

/// Tunables for grouping, filtering and the Tesseract recognizer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Vertical distance (px) within which a block joins an existing line.
    #[serde(default = "default_y_tolerance")]
    pub y_tolerance: f32,
    /// Horizontal gap (px) above which consecutive blocks get a space.
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f32,
    /// Blocks below this recognition confidence are dropped before grouping.
    #[serde(default)]
    pub min_confidence: f32,
    /// Screen region containing the report table, relative to the capture.
    #[serde(default)]
    pub report_region: RelativeRect,
    /// Tesseract language model.
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// Tesseract page segmentation mode.
    #[serde(default = "default_ocr_psm")]
    pub ocr_psm: u8,
    /// Binarization threshold for dark report text; None = plain grayscale.
    #[serde(default)]
    pub ocr_threshold: Option<u8>,
}

fn default_y_tolerance() -> f32 {
    DEFAULT_Y_TOLERANCE
}

fn default_gap_threshold() -> f32 {
    DEFAULT_GAP_THRESHOLD
}

fn default_ocr_language() -> String {
    "deu".to_string()
}

fn default_ocr_psm() -> u8 {
    6
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            y_tolerance: default_y_tolerance(),
            gap_threshold: default_gap_threshold(),
            min_confidence: 0.0,
            report_region: RelativeRect::default(),
            ocr_language: default_ocr_language(),
            ocr_psm: default_ocr_psm(),
            ocr_threshold: None,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a JSON file, falling back to defaults when
    /// the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => {
                        log::info!("Config loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        log::warn!(
                            "Failed to parse {}: {}. Using defaults.",
                            path.display(),
                            e
                        );
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                }
            }
        } else {
            log::info!("{} not found. Using default config.", path.display());
        }

        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.y_tolerance, 7.0);
        assert_eq!(config.gap_threshold, 10.0);
        assert_eq!(config.min_confidence, 0.0);
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.ocr_psm, 6);
        assert_eq!(config.ocr_threshold, None);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".json").expect("temp file");
        write!(file, r#"{{"min_confidence": 60.0, "ocr_language": "eng"}}"#).expect("write");

        let config = PipelineConfig::load_or_default(file.path());
        assert_eq!(config.min_confidence, 60.0);
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.y_tolerance, 7.0);
    }

    #[test]
    fn test_missing_file_defaults() {
        let config = PipelineConfig::load_or_default(Path::new("does_not_exist.json"));
        assert_eq!(config.gap_threshold, 10.0);
    }

    #[test]
    fn test_invalid_file_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".json").expect("temp file");
        write!(file, "not json").expect("write");

        let config = PipelineConfig::load_or_default(file.path());
        assert_eq!(config.ocr_language, "deu");
    }
}
