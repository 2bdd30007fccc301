//! Rescaling of numeric feature columns.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::NormalizationMethod;
use crate::profiler::column_stats;
use crate::types::{Cell, Table};

/// Parameters used to rescale one column, kept for the report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParams {
    /// Value subtracted from every cell (mean or min).
    pub offset: f64,
    /// Divisor applied after subtracting the offset.
    pub divisor: f64,
}

/// What a normalization run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationOutcome {
    pub scaled: BTreeMap<String, ScaleParams>,
    pub skipped_columns: Vec<String>,
}

/// Standardizes numeric feature columns.
pub struct Normalizer;

impl Normalizer {
    /// Rescale every numeric feature column with fresh stats.
    ///
    /// Missing cells stay Missing. Labels are never rescaled.
    pub fn normalize(table: &mut Table, method: NormalizationMethod) -> NormalizationOutcome {
        let mut outcome = NormalizationOutcome::default();

        for idx in table.numeric_indices() {
            let name = table.columns()[idx].name.clone();
            let Some(stats) = column_stats(table, idx) else {
                outcome.skipped_columns.push(name);
                continue;
            };

            let params = match method {
                NormalizationMethod::ZScore => ScaleParams {
                    offset: stats.mean,
                    divisor: stats.std_divisor(),
                },
                NormalizationMethod::MinMax => {
                    let range = stats.max - stats.min;
                    ScaleParams {
                        offset: stats.min,
                        // constant column: every value minus min is 0 already
                        divisor: if range > 0.0 { range } else { 1.0 },
                    }
                }
            };

            table.map_column(idx, |cell| match cell {
                Cell::Number(v) => Cell::Number((v - params.offset) / params.divisor),
                other => other.clone(),
            });

            debug!(
                "Normalized '{}' ({}): offset={:.4}, divisor={:.4}",
                name,
                method.as_str(),
                params.offset,
                params.divisor
            );
            outcome.scaled.insert(name, params);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::compute_stats;
    use crate::types::{ColumnKind, ColumnSpec};
    use crate::utils::approx_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn table(columns: &[Vec<f64>]) -> Table {
        let mut specs: Vec<ColumnSpec> = (0..columns.len())
            .map(|i| ColumnSpec::new(format!("f{}", i), ColumnKind::Numeric))
            .collect();
        specs.push(ColumnSpec::new("y", ColumnKind::Label));

        let height = columns.first().map(|c| c.len()).unwrap_or(0);
        let rows = (0..height)
            .map(|r| {
                let mut row: Vec<Cell> = columns.iter().map(|c| Cell::Number(c[r])).collect();
                row.push(Cell::Number(r as f64));
                row
            })
            .collect();
        Table::new(specs, rows).unwrap()
    }

    #[test]
    fn test_zscore_mean_zero_std_one() {
        let mut rng = StdRng::seed_from_u64(1234);
        let columns: Vec<Vec<f64>> = (0..3)
            .map(|_| (0..250).map(|_| rng.gen_range(-50.0..150.0)).collect())
            .collect();
        let mut table = table(&columns);

        Normalizer::normalize(&mut table, NormalizationMethod::ZScore);

        for idx in table.numeric_indices() {
            let stats = compute_stats(&table.numeric_values(idx)).unwrap();
            assert!(approx_eq(stats.mean, 0.0, 1e-9), "mean was {}", stats.mean);
            assert!(approx_eq(stats.std_dev, 1.0, 1e-9), "std was {}", stats.std_dev);
        }
    }

    #[test]
    fn test_constant_column_becomes_zero() {
        let mut table = table(&[vec![4.0, 4.0, 4.0]]);
        let outcome = Normalizer::normalize(&mut table, NormalizationMethod::ZScore);
        assert_eq!(table.numeric_values(0), vec![0.0, 0.0, 0.0]);
        assert_eq!(outcome.scaled["f0"].divisor, 1.0);
    }

    #[test]
    fn test_huge_constant_column_becomes_zero() {
        let mut table = table(&[vec![1e308, 1e308, 1e308]]);
        Normalizer::normalize(&mut table, NormalizationMethod::ZScore);
        assert_eq!(table.numeric_values(0), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_label_untouched() {
        let mut table = table(&[vec![1.0, 2.0, 3.0]]);
        Normalizer::normalize(&mut table, NormalizationMethod::ZScore);
        let labels: Vec<f64> = table.column_cells(1).filter_map(Cell::as_number).collect();
        assert_eq!(labels, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_minmax() {
        let mut table = table(&[vec![2.0, 4.0, 6.0], vec![3.0, 3.0, 3.0]]);
        Normalizer::normalize(&mut table, NormalizationMethod::MinMax);
        assert_eq!(table.numeric_values(0), vec![0.0, 0.5, 1.0]);
        assert_eq!(table.numeric_values(1), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_stays_missing() {
        let mut table = Table::new(
            vec![
                ColumnSpec::new("x", ColumnKind::Numeric),
                ColumnSpec::new("gone", ColumnKind::Numeric),
                ColumnSpec::new("y", ColumnKind::Label),
            ],
            vec![
                vec![Cell::Number(1.0), Cell::Missing, Cell::Number(0.0)],
                vec![Cell::Missing, Cell::Missing, Cell::Number(1.0)],
                vec![Cell::Number(3.0), Cell::Missing, Cell::Number(0.0)],
            ],
        )
        .unwrap();
        let outcome = Normalizer::normalize(&mut table, NormalizationMethod::ZScore);
        assert_eq!(table.cell(1, 0), &Cell::Missing);
        assert_eq!(table.numeric_values(0), vec![-1.0, 1.0]);
        assert_eq!(outcome.skipped_columns, vec!["gone".to_string()]);
    }
}
