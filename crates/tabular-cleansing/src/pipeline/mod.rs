//! Pipeline module.
//!
//! This module provides the cleansing pipeline and its numeric stages.

mod builder;
mod executor;
pub mod normalizer;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use executor::{CleansingExecutor, CleansingResult};
pub use normalizer::{NormalizationOutcome, Normalizer, ScaleParams};
pub use outliers::{MAX_RESOLUTION_PASSES, OutlierOutcome, OutlierResolver};
pub use progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
