//! Progress reporting and cancellation for the cleansing pipeline.
//!
//! The pipeline emits a [`ProgressUpdate`] as it enters each stage and checks
//! its [`CancellationToken`] between stages.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabular_cleansing::{CancellationToken, Pipeline};
//!
//! let token = CancellationToken::new();
//! let canceller = token.clone();
//! std::thread::spawn(move || canceller.cancel());
//!
//! let result = Pipeline::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| println!("[{:?}] {}", update.stage, update.message))
//!     .build()?
//!     .process(raw);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of the cleansing pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Choosing the label and inferring column kinds
    Classification,
    /// Filling or dropping missing numeric values
    Imputation,
    /// Replacing or dropping IQR outliers
    OutlierResolution,
    /// Rescaling numeric features
    Normalization,
    /// Encoding categorical columns
    Encoding,
    /// Assembling the cleansing report
    Reporting,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline was cancelled
    Cancelled,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Classification => "Classifying Columns",
            Self::Imputation => "Imputing Values",
            Self::OutlierResolution => "Resolving Outliers",
            Self::Normalization => "Normalizing Features",
            Self::Encoding => "Encoding Categories",
            Self::Reporting => "Building Report",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Classification => 0.15,
            Self::Imputation => 0.20,
            Self::OutlierResolution => 0.25,
            Self::Normalization => 0.15,
            Self::Encoding => 0.15,
            Self::Reporting => 0.10,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Classification => 0.0,
            Self::Imputation => 0.15,
            Self::OutlierResolution => 0.35,
            Self::Normalization => 0.60,
            Self::Encoding => 0.75,
            Self::Reporting => 0.90,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// Progress update emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Optional sub-stage description (e.g., "Column: age")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a progress update for a stage without sub-stage info.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a progress update with item counts.
    pub fn with_items(
        stage: PipelineStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            sub_stage: Some(sub_stage.into()),
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    /// Creates a cancelled progress update.
    pub fn cancelled() -> Self {
        Self::new(PipelineStage::Cancelled, 0.0, "Pipeline cancelled")
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, 0.0, message)
    }
}

/// Receives progress updates during a run.
///
/// Implementations must be `Send + Sync` so a pipeline running on a worker
/// thread can report to a caller on another thread.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running pipeline.
///
/// Clones share one flag, so [`cancel()`](Self::cancel) on any clone is seen
/// by the pipeline at its next stage boundary, which then returns
/// [`CleansingError::Cancelled`](crate::error::CleansingError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can serve another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancellation_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();
        assert!(!token2.is_cancelled());

        token1.cancel();
        assert!(token2.is_cancelled());

        token2.reset();
        assert!(!token1.is_cancelled());
    }

    #[test]
    fn test_progress_update_with_items() {
        let update = ProgressUpdate::with_items(
            PipelineStage::Imputation,
            "Column: age",
            1,
            4,
            "Imputing age",
        );
        assert_eq!(update.sub_stage.as_deref(), Some("Column: age"));
        assert_eq!(update.stage_progress, 0.25);
        assert!((update.progress - 0.20).abs() < 1e-6);
        assert_eq!(update.items_total, Some(4));
    }

    #[test]
    fn test_terminal_updates() {
        assert_eq!(ProgressUpdate::complete("Done").progress, 1.0);
        assert_eq!(ProgressUpdate::cancelled().stage, PipelineStage::Cancelled);
        assert_eq!(ProgressUpdate::failed("boom").message, "boom");
    }

    #[test]
    fn test_stage_weights_sum() {
        let stages = [
            PipelineStage::Classification,
            PipelineStage::Imputation,
            PipelineStage::OutlierResolution,
            PipelineStage::Normalization,
            PipelineStage::Encoding,
            PipelineStage::Reporting,
        ];
        let total: f32 = stages.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.01, "Weights should sum to ~1.0");

        for pair in stages.windows(2) {
            let end = pair[0].base_progress() + pair[0].weight();
            assert!((end - pair[1].base_progress()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stage_json_values() {
        let expectations = [
            (PipelineStage::Classification, "\"classification\""),
            (PipelineStage::OutlierResolution, "\"outlier_resolution\""),
            (PipelineStage::Reporting, "\"reporting\""),
            (PipelineStage::Failed, "\"failed\""),
        ];
        for (stage, expected) in expectations {
            assert_eq!(serde_json::to_string(&stage).unwrap(), expected);
        }
    }

    #[test]
    fn test_progress_reporter_across_threads() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let counter = call_count.clone();

        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let shared = reporter.clone();
        std::thread::spawn(move || {
            shared.report(ProgressUpdate::new(PipelineStage::Encoding, 0.5, "bg"));
        })
        .join()
        .expect("Thread should not panic");

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
