//! Locates the patient value inside one formatted report line.
//!
//! A report line reads `<parameter name> <reference range> <unit> <value>
//! [flag]`, but OCR token counts vary, so a fixed column index is unreliable.
//! The extractor instead finds the end of the descriptive prefix (unit and
//! reference-range tokens) and returns the first numeric-looking token after
//! it. This is a deliberate heuristic: the returned value is provisional and
//! downstream grading depends on these exact rules.

use regex::Regex;
use std::sync::OnceLock;

/// Matches parenthesized content inside a token, e.g. `145(H)`.
fn paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]*\)").expect("valid regex"))
}

/// Tokens containing a slash or percent sign read as units ("g/L", "%").
fn looks_like_unit(token: &str) -> bool {
    token.contains('/') || token.contains('%')
}

/// Tokens with a dash but no period read as reference ranges ("134-180").
/// The period exclusion keeps decimal-bearing tokens out of this bucket.
fn looks_like_range(token: &str) -> bool {
    token.contains('-') && !token.contains('.')
}

/// Normalizes one token and attempts a numeric parse.
///
/// Drops parenthesized content, trims leading/trailing severity flags
/// (L/H), and converts a decimal comma to a decimal point. Shared with the
/// grading engine so both sides agree on what counts as a number.
pub fn parse_value(token: &str) -> Option<f64> {
    let cleaned = paren_re().replace_all(token, "");
    let cleaned = cleaned
        .trim()
        .trim_matches(|c| c == 'L' || c == 'H')
        .replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Returns the first plausible value token after the line's descriptive
/// prefix, in its original unstripped form, or `None` if the line has no
/// extractable value.
pub fn extract_value(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    // Too little structure to contain name + descriptor + value.
    if tokens.len() < 3 {
        return None;
    }

    let last_unit = tokens
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, t)| looks_like_unit(t))
        .map(|(i, _)| i)
        .last();
    let last_range = tokens
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, t)| looks_like_range(t))
        .map(|(i, _)| i)
        .last();

    let descriptive_end = match (last_unit, last_range) {
        (Some(u), Some(r)) => u.max(r),
        (Some(u), None) => u,
        (None, Some(r)) => r,
        (None, None) => 2,
    };

    for token in &tokens[(descriptive_end + 1).min(tokens.len())..] {
        if parse_value(token).is_some() {
            log::debug!("Extracted value {:?} from line {:?}", token, line);
            return Some((*token).to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_plain() {
        assert_eq!(parse_value("145"), Some(145.0));
        assert_eq!(parse_value("3.6"), Some(3.6));
    }

    #[test]
    fn test_parse_value_decimal_comma() {
        assert_eq!(parse_value("3,6"), Some(3.6));
    }

    #[test]
    fn test_parse_value_flags_stripped() {
        assert_eq!(parse_value("45L"), Some(45.0));
        assert_eq!(parse_value("192H"), Some(192.0));
        assert_eq!(parse_value("L0.8"), Some(0.8));
    }

    #[test]
    fn test_parse_value_parenthesized_content_dropped() {
        assert_eq!(parse_value("145(L)"), Some(145.0));
        assert_eq!(parse_value("(vorl.)"), None);
    }

    #[test]
    fn test_parse_value_rejects_non_numeric() {
        assert_eq!(parse_value("g/L"), None);
        assert_eq!(parse_value("134-180"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("LH"), None);
    }

    #[test]
    fn test_extract_typical_line() {
        assert_eq!(
            extract_value("Hämoglobin 134-180 g/L 145"),
            Some("145".to_string())
        );
    }

    #[test]
    fn test_extract_flagged_value() {
        assert_eq!(
            extract_value("Thrombozyten 143-350 G/L 45L"),
            Some("45L".to_string())
        );
    }

    #[test]
    fn test_extract_missing_value_is_absent() {
        assert_eq!(extract_value("Thrombozyten 143-350 G/L"), None);
    }

    #[test]
    fn test_extract_too_few_tokens() {
        assert_eq!(extract_value("Hämoglobin 145"), None);
        assert_eq!(extract_value(""), None);
    }

    #[test]
    fn test_extract_never_returns_descriptive_token() {
        // The range token parses as nothing and the unit marks the boundary;
        // the range's numeric halves must not leak out as the value.
        assert_eq!(
            extract_value("Leukozyten 3.0-9.6 10^9/L 5,1"),
            Some("5,1".to_string())
        );
    }

    #[test]
    fn test_extract_defaults_boundary_without_unit_or_range() {
        // No unit or range token anywhere: boundary defaults to index 2,
        // candidates start at index 3.
        assert_eq!(
            extract_value("Neutrophile absolut gesamt 1.2"),
            Some("1.2".to_string())
        );
        // Value sitting at index 2 is before the default boundary.
        assert_eq!(extract_value("Neutrophile absolut 1.2"), None);
    }

    #[test]
    fn test_extract_unit_after_range() {
        // Unit follows the range; boundary is the later of the two.
        assert_eq!(
            extract_value("Lymphozyten 1.5-4.0 10^9/L 0,3L"),
            Some("0,3L".to_string())
        );
    }

    #[test]
    fn test_extract_skips_unparsable_candidates() {
        assert_eq!(
            extract_value("Hämoglobin 134-180 g/L (vorl.) 145"),
            Some("145".to_string())
        );
    }
}
