//! Per-column statistics used by the imputer, resolver and normalizer.

use serde::{Deserialize, Serialize};

/// Multiplier applied to the IQR when deriving outlier bounds.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Summary statistics over the non-missing values of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Population standard deviation (divides by n).
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Whether a value lies strictly outside `[lower_bound, upper_bound]`.
    #[inline]
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower_bound || value > self.upper_bound
    }

    /// Replacement value for an out-of-bound cell.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.q1 + self.q3) / 2.0
    }

    /// Divisor for z-score standardization; constant columns use 1.
    #[inline]
    pub fn std_divisor(&self) -> f64 {
        if self.std_dev > 0.0 { self.std_dev } else { 1.0 }
    }
}

/// Value at quantile `p` of a non-empty ascending slice, using index ⌊p·(n−1)⌋.
#[inline]
pub(crate) fn quantile_floor(sorted: &[f64], p: f64) -> f64 {
    let last = sorted.len().saturating_sub(1);
    let idx = (p * last as f64).floor() as usize;
    sorted[idx.min(last)]
}

/// Compute statistics over a column's non-missing values.
///
/// Returns `None` when there are no values. The input slice is not reordered;
/// quartiles come from a sorted copy. Mean and deviation stay finite for any
/// finite input, and a constant column always has `std_dev == 0`.
pub fn compute_stats(values: &[f64]) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let (mean, std_dev) = if min == max {
        (min, 0.0)
    } else {
        let n = values.len() as f64;
        // Dividing before summing keeps the mean finite near f64::MAX.
        let mean = values.iter().map(|v| v / n).sum::<f64>().clamp(min, max);
        (mean, population_std(values, mean))
    };

    let q1 = quantile_floor(&sorted, 0.25);
    let q3 = quantile_floor(&sorted, 0.75);
    let iqr = q3 - q1;

    Some(ColumnStats {
        count: values.len(),
        mean,
        q1,
        q3,
        iqr,
        lower_bound: q1 - IQR_MULTIPLIER * iqr,
        upper_bound: q3 + IQR_MULTIPLIER * iqr,
        std_dev,
        min,
        max,
    })
}

/// Population standard deviation, scaled by the largest deviation so the
/// squares cannot overflow.
fn population_std(values: &[f64], mean: f64) -> f64 {
    let scale = values.iter().map(|v| (v - mean).abs()).fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return 0.0;
    }
    let n = values.len() as f64;
    let variance = values
        .iter()
        .map(|v| ((v - mean) / scale).powi(2) / n)
        .sum::<f64>();
    scale * variance.sqrt()
}
