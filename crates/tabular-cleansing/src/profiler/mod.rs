//! Column classification and statistics.
//!
//! This module turns an untyped [`RawTable`] into a typed [`Table`]:
//! - Label selection (last column unless configured)
//! - Kind inference for every other column (Numeric or Categorical)
//! - Cell typing, with malformed numeric cells demoted to Missing
//!
//! It also exposes the statistics engine used by the numeric stages.

mod statistics;
mod type_inference;

pub use statistics::{ColumnStats, IQR_MULTIPLIER, compute_stats};

use tracing::{debug, warn};

use crate::config::CleansingConfig;
use crate::error::{CleansingError, Result};
use crate::types::{Cell, ColumnKind, ColumnSpec, RawTable, Table};
use crate::utils::parse_numeric_cell;
use type_inference::{LabelEncoding, census, infer_feature_kind, infer_label_encoding};

/// Result of classifying a raw table.
#[derive(Debug, Clone)]
pub struct Classification {
    pub table: Table,
    /// Cells that failed numeric parse in a numeric column and became Missing.
    pub malformed_cells: usize,
    /// Whether the label column holds text to be encoded.
    pub text_label: bool,
}

/// Classifies raw columns and types their cells.
pub struct ColumnClassifier;

impl ColumnClassifier {
    /// Classify every column of `raw` and build the typed table.
    pub fn classify(raw: &RawTable, config: &CleansingConfig) -> Result<Classification> {
        if raw.width() == 0 {
            return Ok(Classification {
                table: Table::default(),
                malformed_cells: 0,
                text_label: false,
            });
        }

        let label_idx = Self::label_index(raw, config)?;
        Self::check_forced_kinds(raw, config, label_idx)?;

        let markers = &config.missing_markers;
        let mut specs = Vec::with_capacity(raw.width());
        let mut numeric_cols = vec![false; raw.width()];
        let mut text_label = false;

        for (idx, name) in raw.headers().iter().enumerate() {
            let counts = census(raw.column(idx), markers);

            let kind = if idx == label_idx {
                let encoding = infer_label_encoding(counts);
                numeric_cols[idx] = encoding == LabelEncoding::Numeric;
                text_label = encoding == LabelEncoding::Text;
                ColumnKind::Label
            } else {
                let kind = config
                    .forced_kinds
                    .get(name)
                    .copied()
                    .unwrap_or_else(|| infer_feature_kind(counts));
                numeric_cols[idx] = kind == ColumnKind::Numeric;
                kind
            };

            debug!(
                "Column '{}': kind={}, present={}, numeric={}",
                name,
                kind.as_str(),
                counts.present,
                counts.numeric
            );
            specs.push(ColumnSpec::new(name.clone(), kind));
        }

        let mut malformed_cells = 0;
        let rows = raw
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(idx, value)| {
                        let cell = Self::type_cell(value, numeric_cols[idx], config);
                        if numeric_cols[idx] && cell.is_missing() && !config.is_missing_marker(value)
                        {
                            malformed_cells += 1;
                        }
                        cell
                    })
                    .collect()
            })
            .collect();

        if malformed_cells > 0 {
            warn!(
                "{} malformed cell(s) in numeric columns were treated as missing",
                malformed_cells
            );
        }

        Ok(Classification {
            table: Table::new(specs, rows)?,
            malformed_cells,
            text_label,
        })
    }

    fn label_index(raw: &RawTable, config: &CleansingConfig) -> Result<usize> {
        match &config.label_column {
            Some(name) => raw
                .headers()
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CleansingError::ColumnNotFound(name.clone())),
            None => Ok(raw.width() - 1),
        }
    }

    fn check_forced_kinds(raw: &RawTable, config: &CleansingConfig, label_idx: usize) -> Result<()> {
        for name in config.forced_kinds.keys() {
            match raw.headers().iter().position(|h| h == name) {
                None => return Err(CleansingError::ColumnNotFound(name.clone())),
                Some(idx) if idx == label_idx => {
                    return Err(CleansingError::InvalidConfig(format!(
                        "cannot force the kind of label column '{}'",
                        name
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn type_cell(raw: &str, numeric: bool, config: &CleansingConfig) -> Cell {
        if config.is_missing_marker(raw) {
            return Cell::Missing;
        }
        if numeric {
            parse_numeric_cell(raw).map(Cell::Number).unwrap_or(Cell::Missing)
        } else {
            Cell::Text(raw.trim().to_string())
        }
    }
}

/// Fresh statistics for one column of a table.
pub fn column_stats(table: &Table, idx: usize) -> Option<ColumnStats> {
    compute_stats(&table.numeric_values(idx))
}
