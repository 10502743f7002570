//! Capture → recognize → group → extract → grade orchestration.
//!
//! Scans the formatted lines of one report top to bottom, tracking whether
//! the scan is inside the absolute-count or the relative-percentage block of
//! the differential. Each parameter is resolved at most once, from the first
//! matching line seen in the appropriate block.

use anyhow::Result;
use image::RgbaImage;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::grading::{grade, LabParameter, ReferenceLimits};
use crate::ocr::engine::{TextBlock, TextRecognizer};
use crate::ocr::extract::extract_value;
use crate::ocr::group::group_lines;
use crate::ocr::preprocess::crop_region;

/// Output order of the report tuple.
pub const PARAMETER_ORDER: [LabParameter; 5] = [
    LabParameter::Hemoglobin,
    LabParameter::Leukocytes,
    LabParameter::LymphocytesAbs,
    LabParameter::NeutrophilsAbs,
    LabParameter::Platelets,
];

/// Source of the screen region containing the lab report.
///
/// Capture itself is an external collaborator (platform capture API,
/// file loader, test fixture); the pipeline only needs the resulting image.
pub trait RegionSource {
    fn capture(&mut self) -> Result<RgbaImage>;
}

/// Per-parameter outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub parameter: LabParameter,
    /// Value token as it appeared on the line, if one was found.
    pub raw_value: Option<String>,
    /// CTCAE grade, only ever present when a value parsed successfully.
    pub grade: Option<u8>,
}

/// Fixed-order grade tuple for one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeReport {
    pub hemoglobin: Option<u8>,
    pub leukocytes: Option<u8>,
    pub lymphocytes_abs: Option<u8>,
    pub neutrophils_abs: Option<u8>,
    pub platelets: Option<u8>,
}

impl GradeReport {
    /// Grades in the documented fixed order: Hemoglobin, Leukocytes,
    /// Lymphocytes-abs, Neutrophils-abs, Platelets.
    pub fn as_tuple(&self) -> (Option<u8>, Option<u8>, Option<u8>, Option<u8>, Option<u8>) {
        (
            self.hemoglobin,
            self.leukocytes,
            self.lymphocytes_abs,
            self.neutrophils_abs,
            self.platelets,
        )
    }

    fn set(&mut self, parameter: LabParameter, value: Option<u8>) {
        match parameter {
            LabParameter::Hemoglobin => self.hemoglobin = value,
            LabParameter::Leukocytes => self.leukocytes = value,
            LabParameter::LymphocytesAbs => self.lymphocytes_abs = value,
            LabParameter::NeutrophilsAbs => self.neutrophils_abs = value,
            LabParameter::Platelets => self.platelets = value,
        }
    }
}

/// Differential-hemogram block the line scan is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Absolute counts (also the state before any header is seen).
    Absolute,
    /// Relative percentages; parameter lines here must not be collected.
    Relative,
}

fn section_marker(line_lower: &str) -> Option<Section> {
    if line_lower.contains("absolut") {
        Some(Section::Absolute)
    } else if line_lower.contains("relativ") {
        Some(Section::Relative)
    } else {
        None
    }
}

/// Extracts one value per parameter from the formatted lines.
///
/// First match per parameter wins; lines inside the relative-percentage
/// block are never matched, so a percentage is never collected in place of
/// an absolute count.
pub fn extract_parameters(lines: &[String], limits: &ReferenceLimits) -> Vec<ExtractionResult> {
    let mut results: Vec<ExtractionResult> = PARAMETER_ORDER
        .iter()
        .map(|&parameter| ExtractionResult {
            parameter,
            raw_value: None,
            grade: None,
        })
        .collect();
    let mut resolved = [false; PARAMETER_ORDER.len()];

    let mut section = Section::Absolute;

    for line in lines {
        let lower = line.to_lowercase();
        if let Some(next) = section_marker(&lower) {
            section = next;
            continue;
        }
        if section == Section::Relative {
            continue;
        }

        for (idx, result) in results.iter_mut().enumerate() {
            if resolved[idx] || !result.parameter.matches_line(&lower) {
                continue;
            }
            resolved[idx] = true;

            let raw_value = extract_value(line);
            if raw_value.is_none() {
                log::warn!("No value found on {} line: {:?}", result.parameter, line);
            }
            result.grade = grade(
                result.parameter,
                raw_value.as_deref(),
                limits.for_parameter(result.parameter),
            );
            result.raw_value = raw_value;
        }
    }

    results
}

/// Folds per-parameter results into the fixed-order report.
pub fn assemble_report(results: &[ExtractionResult]) -> GradeReport {
    let mut report = GradeReport::default();
    for result in results {
        report.set(result.parameter, result.grade);
    }
    report
}

/// Grades a single already-captured report image.
///
/// The configured report region is cropped out of the capture before it
/// reaches the recognizer. Recognition failure propagates as `Err`;
/// recognition succeeding with no text is not an error and yields an
/// all-absent report.
pub fn grade_report_image(
    img: &RgbaImage,
    recognizer: &dyn TextRecognizer,
    limits: &ReferenceLimits,
    config: &PipelineConfig,
) -> Result<GradeReport> {
    let region = crop_region(img, &config.report_region);
    let blocks = recognizer.recognize(&region)?;
    Ok(grade_blocks(&blocks, limits, config))
}

/// Grades recognized blocks: confidence filter → group → extract → grade.
pub fn grade_blocks(
    blocks: &[TextBlock],
    limits: &ReferenceLimits,
    config: &PipelineConfig,
) -> GradeReport {
    let kept: Vec<TextBlock> = blocks
        .iter()
        .filter(|b| b.confidence >= config.min_confidence)
        .cloned()
        .collect();
    if kept.len() < blocks.len() {
        log::debug!(
            "Dropped {} low-confidence blocks (floor {:.0})",
            blocks.len() - kept.len(),
            config.min_confidence
        );
    }

    let lines = group_lines(&kept, config.y_tolerance, config.gap_threshold);
    log::debug!("Grouped {} blocks into {} lines", kept.len(), lines.len());

    let results = extract_parameters(&lines, limits);
    for result in &results {
        log::info!(
            "{}: value {:?} grade {:?}",
            result.parameter,
            result.raw_value,
            result.grade
        );
    }
    assemble_report(&results)
}

/// Runs the full pipeline: capture, crop the configured report region,
/// recognize, grade.
///
/// Callers using the bundled Tesseract engine should construct it with
/// `TesseractRecognizer::from_config` so the configured language, page
/// segmentation mode and binarization apply. Any capture or recognition
/// failure aborts with `Err` rather than producing a partial report.
pub fn run_pipeline(
    source: &mut dyn RegionSource,
    recognizer: &dyn TextRecognizer,
    limits: &ReferenceLimits,
    config: &PipelineConfig,
) -> Result<GradeReport> {
    let img = source.capture()?;
    grade_report_image(&img, recognizer, limits, config)
}
