//! Outlier resolution module.
//!
//! Detects out-of-bound numeric feature cells with the IQR rule and either
//! replaces them with the Q1/Q3 midpoint or drops the rows holding them.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::OutlierPolicy;
use crate::profiler::{ColumnStats, column_stats};
use crate::types::{Cell, Table};

/// Upper bound on replacement passes before giving up on convergence.
pub const MAX_RESOLUTION_PASSES: usize = 64;

/// What an outlier resolution run changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierOutcome {
    /// Cells replaced (`replace`) or rows removed (`drop`).
    pub resolved: usize,
    /// Out-of-bound cells found per column, summed over passes.
    pub per_column: BTreeMap<String, usize>,
    /// Number of passes performed.
    pub passes: usize,
    /// Numeric columns without values, left untouched.
    pub skipped_columns: Vec<String>,
}

/// Resolves IQR outliers in numeric feature columns.
pub struct OutlierResolver;

impl OutlierResolver {
    /// Resolve outliers with the given policy. Labels are never touched.
    pub fn resolve(table: &mut Table, policy: OutlierPolicy) -> OutlierOutcome {
        match policy {
            OutlierPolicy::Replace => Self::replace_until_stable(table),
            OutlierPolicy::Drop => Self::drop_rows(table),
        }
    }

    /// Run replacement passes until a pass finds no violations.
    ///
    /// Each pass recomputes bounds from the current column values.
    pub fn replace_until_stable(table: &mut Table) -> OutlierOutcome {
        let mut outcome = OutlierOutcome::default();

        loop {
            let replaced = Self::replace_pass(table, &mut outcome);
            outcome.passes += 1;
            outcome.resolved += replaced;

            if replaced == 0 {
                break;
            }
            if outcome.passes >= MAX_RESOLUTION_PASSES {
                warn!(
                    "Outlier replacement did not settle after {} passes",
                    MAX_RESOLUTION_PASSES
                );
                break;
            }
        }

        debug!(
            "Replaced {} outlier cell(s) in {} pass(es)",
            outcome.resolved, outcome.passes
        );
        outcome
    }

    /// One replacement pass with fresh stats. Returns the number of cells changed.
    fn replace_pass(table: &mut Table, outcome: &mut OutlierOutcome) -> usize {
        let first_pass = outcome.passes == 0;
        let mut replaced = 0;

        for idx in table.numeric_indices() {
            let name = table.columns()[idx].name.clone();
            let Some(stats) = column_stats(table, idx) else {
                if first_pass {
                    outcome.skipped_columns.push(name);
                }
                continue;
            };

            let violations = Self::count_violations(table, idx, &stats);
            if violations == 0 {
                continue;
            }

            let midpoint = stats.midpoint();
            table.map_column(idx, |cell| match cell {
                Cell::Number(v) if stats.is_outlier(*v) => Cell::Number(midpoint),
                other => other.clone(),
            });

            debug!(
                "Column '{}': replaced {} value(s) outside [{:.4}, {:.4}] with {:.4}",
                name, violations, stats.lower_bound, stats.upper_bound, midpoint
            );
            *outcome.per_column.entry(name).or_insert(0) += violations;
            replaced += violations;
        }

        replaced
    }

    /// Remove every row holding an out-of-bound feature value.
    ///
    /// Bounds for all columns are computed before any row is removed.
    pub fn drop_rows(table: &mut Table) -> OutlierOutcome {
        let mut outcome = OutlierOutcome {
            passes: 1,
            ..Default::default()
        };

        let mut bounds: Vec<(usize, ColumnStats)> = Vec::new();
        for idx in table.numeric_indices() {
            let name = table.columns()[idx].name.clone();
            match column_stats(table, idx) {
                Some(stats) => {
                    let violations = Self::count_violations(table, idx, &stats);
                    if violations > 0 {
                        outcome.per_column.insert(name, violations);
                    }
                    bounds.push((idx, stats));
                }
                None => outcome.skipped_columns.push(name),
            }
        }

        outcome.resolved = table.retain_rows(|row| {
            bounds.iter().all(|(idx, stats)| match row[*idx] {
                Cell::Number(v) => !stats.is_outlier(v),
                _ => true,
            })
        });

        debug!("Dropped {} row(s) containing outliers", outcome.resolved);
        outcome
    }

    /// Count cells strictly outside the column bounds.
    pub fn count_violations(table: &Table, idx: usize, stats: &ColumnStats) -> usize {
        table
            .column_cells(idx)
            .filter_map(Cell::as_number)
            .filter(|v| stats.is_outlier(*v))
            .count()
    }

    /// Count violations in every numeric feature column with fresh stats.
    pub fn total_violations(table: &Table) -> usize {
        table
            .numeric_indices()
            .into_iter()
            .filter_map(|idx| column_stats(table, idx).map(|s| Self::count_violations(table, idx, &s)))
            .sum()
    }
}
