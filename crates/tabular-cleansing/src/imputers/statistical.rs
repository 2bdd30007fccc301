//! Mean imputation and missing-row removal.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::profiler::column_stats;
use crate::types::{Cell, Table};

/// What a mean-imputation pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputationOutcome {
    /// Total number of cells filled across all columns.
    pub filled_cells: usize,
    /// Cells filled per column name (only columns with at least one fill).
    pub filled_per_column: BTreeMap<String, usize>,
    /// Numeric columns with no values to compute a mean from.
    pub skipped_columns: Vec<String>,
}

/// Statistical imputation over numeric feature columns.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Replace every Missing cell of each numeric feature column with the
    /// column mean over its current non-missing values.
    ///
    /// Label and categorical columns are untouched. Running it twice fills
    /// nothing the second time.
    pub fn impute_mean(table: &mut Table) -> ImputationOutcome {
        let mut outcome = ImputationOutcome::default();

        for idx in table.numeric_indices() {
            let name = table.columns()[idx].name.clone();

            let Some(stats) = column_stats(table, idx) else {
                warn!("Column '{}' has no numeric values, skipping imputation", name);
                outcome.skipped_columns.push(name);
                continue;
            };

            let missing = table.missing_count(idx);
            if missing == 0 {
                continue;
            }

            table.map_column(idx, |cell| match cell {
                Cell::Missing => Cell::Number(stats.mean),
                other => other.clone(),
            });

            debug!("Filled {} missing cell(s) in '{}' with mean {:.4}", missing, name, stats.mean);
            outcome.filled_cells += missing;
            outcome.filled_per_column.insert(name, missing);
        }

        outcome
    }

    /// Drop every row with a Missing numeric feature cell or a Missing label.
    ///
    /// Columns that are entirely missing are ignored so they cannot empty the
    /// table on their own. Returns the number of rows removed.
    pub fn drop_incomplete_rows(table: &mut Table) -> usize {
        let mut checked: Vec<usize> = table
            .numeric_indices()
            .into_iter()
            .filter(|&idx| table.missing_count(idx) < table.height())
            .collect();
        if let Some(label) = table.label_index() {
            checked.push(label);
        }

        let removed = table.retain_rows(|row| checked.iter().all(|&idx| !row[idx].is_missing()));
        if removed > 0 {
            debug!("Dropped {} row(s) with missing values", removed);
        }
        removed
    }

    /// Drop rows whose label cell is Missing. Returns the number removed.
    pub fn drop_missing_labels(table: &mut Table) -> usize {
        match table.label_index() {
            Some(label) => table.retain_rows(|row| !row[label].is_missing()),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnKind, ColumnSpec};
    use pretty_assertions::assert_eq;

    fn table(rows: Vec<Vec<Cell>>) -> Table {
        Table::new(
            vec![
                ColumnSpec::new("a", ColumnKind::Numeric),
                ColumnSpec::new("empty", ColumnKind::Numeric),
                ColumnSpec::new("c", ColumnKind::Categorical),
                ColumnSpec::new("y", ColumnKind::Label),
            ],
            rows,
        )
        .unwrap()
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn sample() -> Table {
        table(vec![
            vec![n(1.0), Cell::Missing, t("x"), n(0.0)],
            vec![Cell::Missing, Cell::Missing, Cell::Missing, Cell::Missing],
            vec![n(5.0), Cell::Missing, t("y"), n(1.0)],
        ])
    }

    // ==================== impute_mean tests ====================

    #[test]
    fn test_impute_mean_fills_numeric_only() {
        let mut table = sample();
        let outcome = StatisticalImputer::impute_mean(&mut table);

        assert_eq!(outcome.filled_cells, 1);
        assert_eq!(outcome.filled_per_column.get("a"), Some(&1));
        assert_eq!(outcome.skipped_columns, vec!["empty".to_string()]);
        assert_eq!(table.cell(1, 0), &n(3.0));
        // categorical and label untouched
        assert_eq!(table.cell(1, 2), &Cell::Missing);
        assert_eq!(table.cell(1, 3), &Cell::Missing);
    }

    #[test]
    fn test_impute_mean_is_idempotent() {
        let mut table = sample();
        StatisticalImputer::impute_mean(&mut table);
        let second = StatisticalImputer::impute_mean(&mut table);
        assert_eq!(second.filled_cells, 0);
        assert!(second.filled_per_column.is_empty());
    }

    // ==================== row removal tests ====================

    #[test]
    fn test_drop_incomplete_rows_ignores_all_missing_column() {
        let mut table = sample();
        let removed = StatisticalImputer::drop_incomplete_rows(&mut table);
        assert_eq!(removed, 1);
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn test_drop_missing_labels() {
        let mut table = sample();
        assert_eq!(StatisticalImputer::drop_missing_labels(&mut table), 1);
        assert_eq!(StatisticalImputer::drop_missing_labels(&mut table), 0);
    }
}
