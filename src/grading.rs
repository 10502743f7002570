//! CTCAE v5.0 severity grading for the tracked lab parameters.
//!
//! Grades 2–4 come from fixed per-parameter cutoffs; grade 1 is derived from
//! the caller-supplied lower normal limit (LNL), which varies per patient
//! and assay. All cutoff checks use strict `<`.

use serde::{Deserialize, Serialize};

use crate::ocr::extract::parse_value;

/// The closed set of lab parameters this crate grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabParameter {
    /// Hemoglobin, g/L
    Hemoglobin,
    /// Leukocytes, 10^9/L
    Leukocytes,
    /// Platelets, 10^9/L
    Platelets,
    /// Absolute neutrophil count, 10^9/L
    NeutrophilsAbs,
    /// Absolute lymphocyte count, 10^9/L
    LymphocytesAbs,
}

/// Fixed lower-bound cutoffs for grades 4, 3 and 2.
///
/// A missing cutoff means the grade is not defined for the parameter
/// (hemoglobin has no grade-4 cutoff in CTCAE v5.0).
#[derive(Debug, Clone, Copy)]
pub struct GradingThresholds {
    pub grade4: Option<f64>,
    pub grade3: Option<f64>,
    pub grade2: Option<f64>,
}

impl LabParameter {
    /// CTCAE v5.0 cutoff table, units as documented per variant.
    pub const fn thresholds(self) -> GradingThresholds {
        match self {
            LabParameter::Hemoglobin => GradingThresholds {
                grade4: None,
                grade3: Some(80.0),
                grade2: Some(100.0),
            },
            LabParameter::Leukocytes => GradingThresholds {
                grade4: Some(1.0),
                grade3: Some(2.0),
                grade2: Some(3.0),
            },
            LabParameter::Platelets => GradingThresholds {
                grade4: Some(25.0),
                grade3: Some(50.0),
                grade2: Some(75.0),
            },
            LabParameter::NeutrophilsAbs => GradingThresholds {
                grade4: Some(0.5),
                grade3: Some(1.0),
                grade2: Some(1.5),
            },
            LabParameter::LymphocytesAbs => GradingThresholds {
                grade4: Some(0.2),
                grade3: Some(0.5),
                grade2: Some(0.8),
            },
        }
    }

    /// Report-line substrings (lowercase) that identify this parameter on a
    /// German lab report, including common umlaut OCR misreads.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            LabParameter::Hemoglobin => &["hämoglobin", "hamoglobin", "haemoglobin"],
            LabParameter::Leukocytes => &["leukozyten", "leukocyten"],
            LabParameter::Platelets => &["thrombozyten", "thrombocyten"],
            LabParameter::NeutrophilsAbs => &["neutrophile"],
            LabParameter::LymphocytesAbs => &["lymphozyten", "lymphocyten"],
        }
    }

    /// Resolves a parameter from a report-line or caller-supplied name.
    /// Unknown names yield `None`; callers log and continue.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        [
            LabParameter::Hemoglobin,
            LabParameter::Leukocytes,
            LabParameter::Platelets,
            LabParameter::NeutrophilsAbs,
            LabParameter::LymphocytesAbs,
        ]
        .into_iter()
        .find(|p| p.aliases().iter().any(|a| lower.contains(a)))
    }

    /// Returns true if the lowercased line mentions this parameter.
    pub fn matches_line(self, line_lower: &str) -> bool {
        self.aliases().iter().any(|a| line_lower.contains(a))
    }
}

impl std::fmt::Display for LabParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabParameter::Hemoglobin => write!(f, "Hemoglobin"),
            LabParameter::Leukocytes => write!(f, "Leukocytes"),
            LabParameter::Platelets => write!(f, "Platelets"),
            LabParameter::NeutrophilsAbs => write!(f, "Neutrophils (abs)"),
            LabParameter::LymphocytesAbs => write!(f, "Lymphocytes (abs)"),
        }
    }
}

/// Caller-supplied lower normal limits, one per tracked parameter.
/// All optional: a missing limit disables grade 1 for that parameter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReferenceLimits {
    pub hemoglobin: Option<f64>,
    pub leukocytes: Option<f64>,
    pub lymphocytes_abs: Option<f64>,
    pub neutrophils_abs: Option<f64>,
    pub platelets: Option<f64>,
}

impl ReferenceLimits {
    pub fn for_parameter(&self, parameter: LabParameter) -> Option<f64> {
        match parameter {
            LabParameter::Hemoglobin => self.hemoglobin,
            LabParameter::Leukocytes => self.leukocytes,
            LabParameter::Platelets => self.platelets,
            LabParameter::NeutrophilsAbs => self.neutrophils_abs,
            LabParameter::LymphocytesAbs => self.lymphocytes_abs,
        }
    }
}

/// Grades a raw value string on the CTCAE 0–4 scale.
///
/// Checks run in strict order, first match wins: grade 4, grade 3, grade 2
/// cutoffs (strict `<`), then grade 1 for values below the LNL, otherwise 0.
/// An absent or unparsable value yields `None`, never a defaulted grade.
///
/// Leukocytes carry one carve-out: when the supplied LNL equals the grade-2
/// cutoff (3.0), no value below the LNL can have escaped the grade-2 check,
/// so grade 1 is unreachable and the value falls through to 0.
pub fn grade(
    parameter: LabParameter,
    raw_value: Option<&str>,
    lower_normal_limit: Option<f64>,
) -> Option<u8> {
    let raw = raw_value?;
    let value = match parse_value(raw) {
        Some(v) => v,
        None => {
            log::warn!("Unparsable {} value {:?}, no grade assigned", parameter, raw);
            return None;
        }
    };

    let t = parameter.thresholds();
    if let Some(g4) = t.grade4 {
        if value < g4 {
            return Some(4);
        }
    }
    if let Some(g3) = t.grade3 {
        if value < g3 {
            return Some(3);
        }
    }
    if let Some(g2) = t.grade2 {
        if value < g2 {
            return Some(2);
        }
    }
    if let Some(lnl) = lower_normal_limit {
        if value < lnl {
            if parameter == LabParameter::Leukocytes && lnl == 3.0 {
                return Some(0);
            }
            return Some(1);
        }
    }
    Some(0)
}
