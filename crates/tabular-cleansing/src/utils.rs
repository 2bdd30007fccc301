//! Shared utilities for the cleansing pipeline.
//!
//! Cell-string helpers used by both the classifier and the response builder.

// =============================================================================
// Raw Cell Utilities
// =============================================================================

/// Parse a raw cell string as a finite number.
///
/// Surrounding whitespace is ignored. `NaN` and infinities are rejected so
/// that a Numeric column only ever holds finite values.
#[inline]
pub fn parse_numeric_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Check whether a raw cell string denotes a missing value.
///
/// Empty or whitespace-only strings are always missing. Markers are compared
/// trimmed and case-insensitively.
pub fn is_missing_marker(raw: &str, markers: &[String]) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || markers
            .iter()
            .any(|m| !m.trim().is_empty() && m.trim().eq_ignore_ascii_case(trimmed))
}

/// Compare two floats within an absolute tolerance.
#[inline]
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
