//! Kind inference over raw cell strings.

use crate::types::ColumnKind;
use crate::utils::{is_missing_marker, parse_numeric_cell};

/// How a label column's cells are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LabelEncoding {
    /// Every non-missing cell parses, or numbers are the majority.
    Numeric,
    /// Text labels; encoded to codes like a categorical column.
    Text,
}

/// Counts of non-missing cells in one raw column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CellCensus {
    pub present: usize,
    pub numeric: usize,
}

impl CellCensus {
    pub fn non_numeric(&self) -> usize {
        self.present - self.numeric
    }
}

/// Count present and numeric cells, ignoring missing markers.
pub(crate) fn census<'a>(cells: impl Iterator<Item = &'a str>, markers: &[String]) -> CellCensus {
    let mut census = CellCensus::default();
    for raw in cells {
        if is_missing_marker(raw, markers) {
            continue;
        }
        census.present += 1;
        if parse_numeric_cell(raw).is_some() {
            census.numeric += 1;
        }
    }
    census
}

/// Infer the kind of a feature column.
///
/// A column is Numeric iff every non-missing cell parses as a finite number.
/// An all-missing column is Numeric as well; the stages skip it later.
pub(crate) fn infer_feature_kind(census: CellCensus) -> ColumnKind {
    if census.non_numeric() == 0 {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Decide how the label column is represented.
///
/// Mixed labels where numbers hold a strict majority stay numeric; the text
/// cells then count as malformed.
pub(crate) fn infer_label_encoding(census: CellCensus) -> LabelEncoding {
    if census.numeric * 2 > census.present || census.non_numeric() == 0 {
        LabelEncoding::Numeric
    } else {
        LabelEncoding::Text
    }
}
