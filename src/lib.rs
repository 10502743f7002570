//! Lab-report structuring and CTCAE v5.0 toxicity grading.
//!
//! Takes a screenshot of a tabular lab report, groups the recognizer's
//! noisy text fragments into coherent rows, extracts the patient value from
//! each relevant row, and grades it against parameter-specific CTCAE
//! cutoffs. Screen capture and text recognition are external collaborators
//! behind the `RegionSource` and `TextRecognizer` traits; a Tesseract-backed
//! recognizer is provided.
//!
//! Anything uncertain stays uncertain: a value that cannot be located or
//! parsed yields an absent grade for the human reviewer, never a default.

pub mod config;
pub mod grading;
pub mod ocr;
pub mod pipeline;

pub use config::PipelineConfig;
pub use grading::{grade, GradingThresholds, LabParameter, ReferenceLimits};
pub use ocr::{TesseractRecognizer, TextBlock, TextRecognizer};
pub use pipeline::{
    grade_blocks, grade_report_image, run_pipeline, ExtractionResult, GradeReport, RegionSource,
    PARAMETER_ORDER,
};
