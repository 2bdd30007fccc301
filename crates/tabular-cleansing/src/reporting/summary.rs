//! The cleansing report and the counters that feed it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{NormalizationMethod, OutlierPolicy};
use crate::encoder::CategoricalMapping;
use crate::imputers::ImputationOutcome;
use crate::pipeline::outliers::OutlierOutcome;
use crate::pipeline::normalizer::NormalizationOutcome;
use crate::profiler::column_stats;
use crate::types::{ColumnKind, Table};

/// Structured result of one cleansing run (camelCase on the wire).
///
/// The first six fields are the canonical report; the rest are additive and
/// default when absent so that minimal upstream reports still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleansingReport {
    /// Final row count.
    pub samples: usize,
    /// Number of numeric feature columns in the final table.
    pub features: usize,
    /// Missing numeric cells replaced by the imputer.
    pub missing_filled: usize,
    /// Cells replaced (`replace`) or rows removed (`drop`) by the resolver.
    pub outliers_removed: usize,
    pub categorical_mappings: BTreeMap<String, CategoricalMapping>,
    /// Whether every numeric stage ran over a non-empty table.
    pub ready: bool,

    /// Rows removed by missing-value handling (not by the outlier resolver).
    #[serde(default)]
    pub rows_dropped: usize,
    /// Label cells that were missing after classification.
    #[serde(default)]
    pub missing_labels: usize,
    /// Unparsable cells in numeric columns, treated as missing.
    #[serde(default)]
    pub malformed_cells: usize,
    /// Numeric columns without any value, skipped by every numeric stage.
    #[serde(default)]
    pub skipped_columns: Vec<String>,
    #[serde(default)]
    pub outlier_policy: OutlierPolicy,
    #[serde(default)]
    pub normalization: NormalizationMethod,
    #[serde(default)]
    pub columns: Vec<ColumnSummary>,
}

impl CleansingReport {
    /// Degenerate report for a table without rows.
    pub fn empty(outlier_policy: OutlierPolicy, normalization: NormalizationMethod) -> Self {
        Self {
            samples: 0,
            features: 0,
            missing_filled: 0,
            outliers_removed: 0,
            categorical_mappings: BTreeMap::new(),
            ready: false,
            rows_dropped: 0,
            missing_labels: 0,
            malformed_cells: 0,
            skipped_columns: Vec::new(),
            outlier_policy,
            normalization,
            columns: Vec::new(),
        }
    }
}

/// Per-column view of what the run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    /// Missing cells right after classification.
    pub missing_before: usize,
    pub filled: usize,
    /// Out-of-bound cells found by the resolver.
    pub outliers: usize,
    /// Mean after normalization (numeric columns only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mean: Option<f64>,
    /// Population std after normalization (numeric columns only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub std_dev: Option<f64>,
    /// Number of distinct categories (encoded columns only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub categories: Option<usize>,
}

impl ColumnSummary {
    pub fn new(name: impl Into<String>, kind: ColumnKind, missing_before: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            missing_before,
            filled: 0,
            outliers: 0,
            mean: None,
            std_dev: None,
            categories: None,
        }
    }
}

/// Accumulates stage counters and assembles the final [`CleansingReport`].
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    missing_filled: usize,
    outliers_removed: usize,
    rows_dropped: usize,
    missing_labels: usize,
    malformed_cells: usize,
    skipped: BTreeSet<String>,
    columns: Vec<ColumnSummary>,
}

impl ReportBuilder {
    /// Start a report for a freshly classified table.
    pub fn new(table: &Table) -> Self {
        let columns = table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, spec)| ColumnSummary::new(&spec.name, spec.kind, table.missing_count(idx)))
            .collect();
        Self {
            columns,
            ..Default::default()
        }
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut ColumnSummary> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn record_malformed(&mut self, count: usize) -> &mut Self {
        self.malformed_cells += count;
        self
    }

    pub fn record_missing_labels(&mut self, count: usize) -> &mut Self {
        self.missing_labels += count;
        self
    }

    pub fn record_rows_dropped(&mut self, count: usize) -> &mut Self {
        self.rows_dropped += count;
        self
    }

    pub fn record_imputation(&mut self, outcome: &ImputationOutcome) -> &mut Self {
        self.missing_filled += outcome.filled_cells;
        for (name, filled) in &outcome.filled_per_column {
            if let Some(column) = self.column_mut(name) {
                column.filled += filled;
            }
        }
        self.skipped.extend(outcome.skipped_columns.iter().cloned());
        self
    }

    pub fn record_outliers(&mut self, outcome: &OutlierOutcome) -> &mut Self {
        self.outliers_removed += outcome.resolved;
        for (name, count) in &outcome.per_column {
            if let Some(column) = self.column_mut(name) {
                column.outliers += count;
            }
        }
        self.skipped.extend(outcome.skipped_columns.iter().cloned());
        self
    }

    pub fn record_normalization(&mut self, outcome: &NormalizationOutcome) -> &mut Self {
        self.skipped.extend(outcome.skipped_columns.iter().cloned());
        self
    }

    pub fn missing_filled(&self) -> usize {
        self.missing_filled
    }

    /// Assemble the report from the counters and the final table.
    pub fn build(
        self,
        table: &Table,
        mappings: BTreeMap<String, CategoricalMapping>,
        stages_completed: bool,
        outlier_policy: OutlierPolicy,
        normalization: NormalizationMethod,
    ) -> CleansingReport {
        let mut columns = self.columns;
        for column in &mut columns {
            if column.kind == ColumnKind::Numeric
                && let Some(idx) = table.index_of(&column.name)
                && let Some(stats) = column_stats(table, idx)
            {
                column.mean = Some(stats.mean);
                column.std_dev = Some(stats.std_dev);
            }
            if let Some(mapping) = mappings.get(&column.name) {
                column.categories = Some(mapping.len());
            }
        }

        CleansingReport {
            samples: table.height(),
            features: table.feature_count(),
            missing_filled: self.missing_filled,
            outliers_removed: self.outliers_removed,
            categorical_mappings: mappings,
            ready: stages_completed && !table.is_empty(),
            rows_dropped: self.rows_dropped,
            missing_labels: self.missing_labels,
            malformed_cells: self.malformed_cells,
            skipped_columns: self.skipped.into_iter().collect(),
            outlier_policy,
            normalization,
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, ColumnSpec};
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        Table::new(
            vec![
                ColumnSpec::new("x", ColumnKind::Numeric),
                ColumnSpec::new("y", ColumnKind::Label),
            ],
            vec![
                vec![Cell::Missing, Cell::Number(0.0)],
                vec![Cell::Number(2.0), Cell::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_builder_accumulates_counters() {
        let table = table();
        let mut builder = ReportBuilder::new(&table);
        let imputation = ImputationOutcome {
            filled_cells: 1,
            filled_per_column: BTreeMap::from([("x".to_string(), 1)]),
            skipped_columns: vec!["z".to_string()],
        };
        builder
            .record_imputation(&imputation)
            .record_missing_labels(1)
            .record_malformed(2)
            .record_rows_dropped(0);

        let report = builder.build(
            &table,
            BTreeMap::new(),
            true,
            OutlierPolicy::Replace,
            NormalizationMethod::ZScore,
        );

        assert_eq!(report.samples, 2);
        assert_eq!(report.features, 1);
        assert_eq!(report.missing_filled, 1);
        assert_eq!(report.missing_labels, 1);
        assert_eq!(report.malformed_cells, 2);
        assert_eq!(report.skipped_columns, vec!["z".to_string()]);
        assert!(report.ready);
        assert_eq!(report.columns[0].missing_before, 1);
        assert_eq!(report.columns[0].filled, 1);
        assert_eq!(report.columns[0].mean, Some(2.0));
        assert_eq!(report.columns[1].mean, None);
    }

    #[test]
    fn test_report_wire_names() {
        let report = CleansingReport::empty(OutlierPolicy::Drop, NormalizationMethod::MinMax);
        let json = serde_json::to_value(&report).unwrap();
        for key in [
            "samples",
            "features",
            "missingFilled",
            "outliersRemoved",
            "categoricalMappings",
            "ready",
            "rowsDropped",
            "missingLabels",
            "malformedCells",
            "skippedColumns",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(json["outlierPolicy"], "drop");
        assert_eq!(json["normalization"], "minmax");
        assert_eq!(json["ready"], false);
    }

    #[test]
    fn test_minimal_report_parses() {
        let json = r#"{"samples":3,"features":2,"missingFilled":0,"outliersRemoved":0,
            "categoricalMappings":{},"ready":true}"#;
        let report: CleansingReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(report.outlier_policy, OutlierPolicy::Replace);
        assert!(report.columns.is_empty());
    }
}
