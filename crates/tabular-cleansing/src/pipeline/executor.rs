//! Stage execution over a classified table.
//!
//! The executor is the pure part of the pipeline: it takes a classified
//! table and a configuration and returns the cleaned table and its report.
//! Progress reporting and cancellation are injected through a hook that runs
//! before every stage.

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::{CleansingConfig, MissingLabelPolicy, MissingValueStrategy};
use crate::encoder::{CategoricalEncoder, CategoricalMapping};
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::pipeline::normalizer::Normalizer;
use crate::pipeline::outliers::OutlierResolver;
use crate::pipeline::progress::PipelineStage;
use crate::profiler::Classification;
use crate::reporting::{CleansingReport, ReportBuilder};
use crate::types::{Cell, Table};

/// Cleaned table plus the report describing how it was produced.
#[derive(Debug, Clone)]
pub struct CleansingResult {
    pub table: Table,
    pub report: CleansingReport,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl CleansingResult {
    /// The label column as a numeric sequence; missing labels are `None`.
    ///
    /// Empty if the table has no label column.
    pub fn labels(&self) -> Vec<Option<f64>> {
        match self.table.label_index() {
            Some(idx) => self.table.column_cells(idx).map(Cell::as_number).collect(),
            None => Vec::new(),
        }
    }

    /// Every row without its label cell, in column order.
    pub fn feature_rows(&self) -> Vec<Vec<Cell>> {
        let label = self.table.label_index();
        self.table
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(idx, _)| Some(*idx) != label)
                    .map(|(_, cell)| cell.clone())
                    .collect()
            })
            .collect()
    }

    pub fn mappings(&self) -> &BTreeMap<String, CategoricalMapping> {
        &self.report.categorical_mappings
    }
}

/// Runs the cleansing stages in order over a classified table.
pub struct CleansingExecutor<'a> {
    config: &'a CleansingConfig,
}

impl<'a> CleansingExecutor<'a> {
    pub fn new(config: &'a CleansingConfig) -> Self {
        Self { config }
    }

    /// Execute every stage after classification.
    ///
    /// `before_stage` is called with each stage before it starts; an error
    /// from it aborts the run without a report.
    pub fn execute(
        &self,
        classification: Classification,
        mut before_stage: impl FnMut(PipelineStage) -> Result<()>,
    ) -> Result<(Table, CleansingReport)> {
        let config = self.config;
        let mut table = classification.table;

        if table.is_empty() {
            info!("Table has no rows, returning an empty report");
            let mut report = CleansingReport::empty(config.outlier_policy, config.normalization);
            report.features = table.feature_count();
            return Ok((table, report));
        }

        let mut report = ReportBuilder::new(&table);
        report.record_malformed(classification.malformed_cells);

        // Mappings come from every classified row so that re-applying them
        // to the loaded data matches, whatever rows the stages remove.
        let mappings = CategoricalEncoder::build_mappings(&table);

        // Missing values
        before_stage(PipelineStage::Imputation)?;
        self.handle_missing(&mut table, &mut report);

        // Outliers
        before_stage(PipelineStage::OutlierResolution)?;
        let outliers = OutlierResolver::resolve(&mut table, config.outlier_policy);
        info!(
            "Outlier resolution ({}): {} resolved",
            config.outlier_policy.as_str(),
            outliers.resolved
        );
        report.record_outliers(&outliers);

        // Normalization
        before_stage(PipelineStage::Normalization)?;
        let normalized = Normalizer::normalize(&mut table, config.normalization);
        info!(
            "Normalized {} column(s) with {}",
            normalized.scaled.len(),
            config.normalization.as_str()
        );
        report.record_normalization(&normalized);

        // Encoding
        before_stage(PipelineStage::Encoding)?;
        CategoricalEncoder::encode_with(&mut table, &mappings);
        info!("Encoded {} column(s)", mappings.len());

        before_stage(PipelineStage::Reporting)?;
        let report = report.build(
            &table,
            mappings,
            true,
            config.outlier_policy,
            config.normalization,
        );
        if !report.skipped_columns.is_empty() {
            warn!(
                "Skipped column(s) without values: {}",
                report.skipped_columns.join(", ")
            );
        }

        Ok((table, report))
    }

    fn handle_missing(&self, table: &mut Table, report: &mut ReportBuilder) {
        let missing_labels = table.label_index().map(|idx| table.missing_count(idx)).unwrap_or(0);
        report.record_missing_labels(missing_labels);

        if missing_labels > 0 {
            warn!("{} row(s) have no label", missing_labels);
            if self.config.missing_labels == MissingLabelPolicy::Drop {
                let dropped = StatisticalImputer::drop_missing_labels(table);
                report.record_rows_dropped(dropped);
            }
        }

        match self.config.missing_values {
            MissingValueStrategy::Impute => {
                let outcome = StatisticalImputer::impute_mean(table);
                info!("Imputation: {} cell(s) filled", outcome.filled_cells);
                report.record_imputation(&outcome);
            }
            MissingValueStrategy::DropRows => {
                let dropped = StatisticalImputer::drop_incomplete_rows(table);
                info!("Dropped {} incomplete row(s)", dropped);
                report.record_rows_dropped(dropped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutlierPolicy;
    use crate::profiler::ColumnClassifier;
    use crate::types::RawTable;
    use pretty_assertions::assert_eq;

    fn classify(headers: &[&str], rows: &[&[&str]], config: &CleansingConfig) -> Classification {
        let raw = RawTable::from_rows(
            headers.iter().copied(),
            rows.iter().map(|r| r.iter().copied()),
        )
        .unwrap();
        ColumnClassifier::classify(&raw, config).unwrap()
    }

    #[test]
    fn test_stages_called_in_order() {
        let config = CleansingConfig::default();
        let classification = classify(&["x", "y"], &[&["1", "0"], &["2", "1"]], &config);

        let mut seen = Vec::new();
        CleansingExecutor::new(&config)
            .execute(classification, |stage| {
                seen.push(stage);
                Ok(())
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                PipelineStage::Imputation,
                PipelineStage::OutlierResolution,
                PipelineStage::Normalization,
                PipelineStage::Encoding,
                PipelineStage::Reporting,
            ]
        );
    }

    #[test]
    fn test_hook_error_aborts() {
        let config = CleansingConfig::default();
        let classification = classify(&["x", "y"], &[&["1", "0"]], &config);
        let result = CleansingExecutor::new(&config).execute(classification, |stage| {
            if stage == PipelineStage::Normalization {
                Err(crate::error::CleansingError::Cancelled)
            } else {
                Ok(())
            }
        });
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_missing_labels_keep_and_drop() {
        let rows: &[&[&str]] = &[&["1", "0"], &["2", ""], &["3", "1"]];

        let keep = CleansingConfig::default();
        let (table, report) = CleansingExecutor::new(&keep)
            .execute(classify(&["x", "y"], rows, &keep), |_| Ok(()))
            .unwrap();
        assert_eq!(report.missing_labels, 1);
        assert_eq!(report.rows_dropped, 0);
        assert_eq!(table.height(), 3);

        let drop = CleansingConfig::builder()
            .missing_labels(MissingLabelPolicy::Drop)
            .build()
            .unwrap();
        let (table, report) = CleansingExecutor::new(&drop)
            .execute(classify(&["x", "y"], rows, &drop), |_| Ok(()))
            .unwrap();
        assert_eq!(report.missing_labels, 1);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn test_drop_rows_strategy() {
        let config = CleansingConfig::builder()
            .missing_values(MissingValueStrategy::DropRows)
            .outlier_policy(OutlierPolicy::Drop)
            .build()
            .unwrap();
        let classification = classify(
            &["a", "b", "y"],
            &[&["1", "", "0"], &["2", "5", "1"], &["3", "6", "0"], &["4", "7", "1"]],
            &config,
        );
        let (table, report) = CleansingExecutor::new(&config)
            .execute(classification, |_| Ok(()))
            .unwrap();
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(report.missing_filled, 0);
        assert_eq!(report.samples, 3);
        assert_eq!(table.height(), 3);
        assert!(report.ready);
    }

    #[test]
    fn test_empty_table_is_degenerate() {
        let config = CleansingConfig::default();
        let classification = classify(&["x", "y"], &[], &config);
        let (table, report) = CleansingExecutor::new(&config)
            .execute(classification, |_| panic!("no stage should run"))
            .unwrap();
        assert!(table.is_empty());
        assert!(!report.ready);
        assert_eq!(report.samples, 0);
        assert_eq!(report.missing_filled, 0);
        assert_eq!(report.outliers_removed, 0);
    }
}
