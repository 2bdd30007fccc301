//! Main cleansing pipeline.
//!
//! This module provides the `Pipeline` struct and its builder. The pipeline
//! classifies a raw table, runs the stages through [`CleansingExecutor`], and
//! reports progress and cancellation around them.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::CleansingConfig;
use crate::error::{CleansingError, Result};
use crate::pipeline::executor::{CleansingExecutor, CleansingResult};
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{Classification, ColumnClassifier};
use crate::types::RawTable;

/// The cleansing pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_cleansing::{CleansingConfig, OutlierPolicy, Pipeline};
///
/// let result = Pipeline::builder()
///     .config(CleansingConfig::builder().outlier_policy(OutlierPolicy::Drop).build()?)
///     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
///     .build()?
///     .process(raw)?;
///
/// println!("{} samples, ready = {}", result.report.samples, result.report.ready);
/// ```
pub struct Pipeline {
    config: CleansingConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleansingConfig {
        &self.config
    }

    /// Classify and clean a raw table.
    ///
    /// # Errors
    ///
    /// Returns `Err(CleansingError::Cancelled)` if the token was cancelled
    /// before a stage started. No partial report is produced in that case.
    pub fn process(&self, raw: RawTable) -> Result<CleansingResult> {
        self.finish(self.process_internal(raw))
    }

    /// Clean an already classified table.
    pub fn process_classified(&self, classification: Classification) -> Result<CleansingResult> {
        let start = Instant::now();
        self.finish(self.run_stages(classification, start))
    }

    fn finish(&self, outcome: Result<CleansingResult>) -> Result<CleansingResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Cleansing complete: {} samples, {} features",
                    result.report.samples, result.report.features
                )));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(CleansingError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, raw: RawTable) -> Result<CleansingResult> {
        let start = Instant::now();
        info!(
            "Starting cleansing pipeline ({} rows, {} columns)",
            raw.height(),
            raw.width()
        );

        self.check_cancelled()?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Classification,
            0.0,
            "Classifying columns...",
        ));

        let classification = ColumnClassifier::classify(&raw, &self.config)?;
        debug!(
            "Classified {} column(s): {} numeric, {} categorical",
            classification.table.width(),
            classification.table.numeric_indices().len(),
            classification.table.categorical_indices().len()
        );

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Classification,
            1.0,
            "Classification complete",
        ));

        self.run_stages(classification, start)
    }

    fn run_stages(&self, classification: Classification, start: Instant) -> Result<CleansingResult> {
        self.check_cancelled()?;

        let executor = CleansingExecutor::new(&self.config);
        let (table, report) = executor.execute(classification, |stage| {
            self.check_cancelled()?;
            self.report_progress(ProgressUpdate::new(
                stage,
                0.0,
                format!("{}...", stage.display_name()),
            ));
            Ok(())
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Cleansing finished in {}ms: samples={}, features={}, missingFilled={}, outliersRemoved={}, ready={}",
            duration_ms,
            report.samples,
            report.features,
            report.missing_filled,
            report.outliers_removed,
            report.ready
        );

        Ok(CleansingResult {
            table,
            report,
            duration_ms,
        })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleansingConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CleansingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For shared or stateful reporters use
    /// [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the pipeline.
    ///
    /// Clone the token and call [`CancellationToken::cancel()`] from any
    /// thread; the pipeline stops at the next stage boundary.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CleansingError::InvalidConfig`] if the configuration does
    /// not validate.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| CleansingError::InvalidConfig(e.to_string()))?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn raw() -> RawTable {
        RawTable::from_rows(
            ["x", "color", "y"],
            vec![
                vec!["1", "red", "0"],
                vec!["", "blue", "1"],
                vec!["3", "red", "0"],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config(), &CleansingConfig::default());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = CleansingConfig {
            output_name: Some("a/b".to_string()),
            ..Default::default()
        };
        let result = Pipeline::builder().config(config).build();
        assert_eq!(result.err().map(|e| e.error_code()), Some("INVALID_CONFIG"));
    }

    #[test]
    fn test_progress_sequence() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        let result = Pipeline::builder()
            .on_progress(move |update| sink.lock().push(update.stage))
            .build()
            .unwrap()
            .process(raw())
            .unwrap();
        assert!(result.report.ready);

        let stages = stages.lock();
        assert_eq!(stages.first(), Some(&PipelineStage::Classification));
        assert_eq!(stages.last(), Some(&PipelineStage::Complete));
        assert!(stages.contains(&PipelineStage::OutlierResolution));
        assert!(stages.contains(&PipelineStage::Encoding));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();

        let last = Arc::new(Mutex::new(None));
        let sink = last.clone();

        let result = Pipeline::builder()
            .cancellation_token(token)
            .on_progress(move |update| *sink.lock() = Some(update.stage))
            .build()
            .unwrap()
            .process(raw());

        assert!(matches!(result, Err(CleansingError::Cancelled)));
        assert_eq!(*last.lock(), Some(PipelineStage::Cancelled));
    }

    #[test]
    fn test_cancel_mid_run() {
        let token = CancellationToken::new();
        let canceller = token.clone();

        let result = Pipeline::builder()
            .cancellation_token(token)
            .on_progress(move |update| {
                if update.stage == PipelineStage::Normalization {
                    canceller.cancel();
                }
            })
            .build()
            .unwrap()
            .process(raw());

        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_unknown_label_fails() {
        let config = CleansingConfig::builder().label_column("nope").build().unwrap();
        let result = Pipeline::builder().config(config).build().unwrap().process(raw());
        assert_eq!(result.unwrap_err().error_code(), "COLUMN_NOT_FOUND");
    }
}
