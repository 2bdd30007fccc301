//! Tabular Cleansing Library
//!
//! A canonical cleansing pipeline for tabular training data, built with Rust
//! and Polars.
//!
//! # Overview
//!
//! Given a CSV table whose last column (or a configured column) is the label,
//! the pipeline produces a cleaned numeric matrix and a report:
//!
//! - **Classification**: every non-label column is Numeric or Categorical
//! - **Imputation**: missing numeric cells become the column mean
//! - **Outlier Resolution**: IQR bounds, replacing with the interquartile
//!   midpoint until stable, or dropping rows
//! - **Normalization**: z-score (or min-max) over numeric feature columns
//! - **Encoding**: first-seen ordinal codes for categorical columns
//! - **Reporting**: samples, features, counters, mappings and readiness
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabular_cleansing::{io, CleansingConfig, OutlierPolicy, Pipeline};
//!
//! let raw = io::read_csv_file("train.csv", true)?;
//!
//! let config = CleansingConfig::builder()
//!     .outlier_policy(OutlierPolicy::Drop)
//!     .label_column("species")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
//!     .build()?
//!     .process(raw)?;
//!
//! println!("samples={} ready={}", result.report.samples, result.report.ready);
//! ```
//!
//! # Service Boundary
//!
//! [`service::handle_request`] accepts a [`service::PreprocessRequest`]
//! (raw CSV text plus optional overrides) and answers with either the
//! cleaned output or an `{error, details}` body. The work is done by a
//! [`service::CleaningDelegate`]: [`service::LocalCleaner`] runs in
//! process, `service::RemoteCleaner` (feature `remote`) forwards to an
//! HTTP service.
//!
//! # Sessions
//!
//! [`Session`] keeps the loaded table, the last result and a short run
//! history for interactive callers, and re-applies the last mappings to
//! tables shown to the user.

pub mod config;
pub mod encoder;
pub mod error;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    CleansingConfig, CleansingConfigBuilder, ConfigValidationError, MissingLabelPolicy,
    MissingValueStrategy, NormalizationMethod, OutlierPolicy,
};
pub use encoder::{CategoricalEncoder, CategoricalMapping, MISSING_CODE};
pub use error::{CleansingError, ResultExt};
pub use imputers::{ImputationOutcome, StatisticalImputer};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, CleansingExecutor, CleansingResult,
    NormalizationOutcome, Normalizer, OutlierOutcome, OutlierResolver, Pipeline, PipelineBuilder,
    PipelineStage, ProgressReporter, ProgressUpdate,
};
pub use profiler::{Classification, ColumnClassifier, ColumnStats, compute_stats};
pub use reporting::{CleansingReport, ColumnSummary, GeneratedReport, ReportGenerator};
pub use service::{
    CleaningDelegate, CleaningOutput, LocalCleaner, PreprocessRequest, PreprocessResponse,
    RequestConfig, handle_request,
};
pub use session::Session;
pub use types::{Cell, ColumnKind, ColumnSpec, RawTable, Table};
