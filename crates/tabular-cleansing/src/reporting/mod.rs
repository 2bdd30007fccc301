//! Report assembly and output.
//!
//! [`ReportBuilder`] collects stage counters during a run and produces the
//! [`CleansingReport`]. [`ReportGenerator`] writes the report and the cleaned
//! dataset to an output directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabular_cleansing::reporting::ReportGenerator;
//!
//! let generator = ReportGenerator::from_config(&config);
//! let (csv, json) = generator.generate_files(Some("train.csv"), &result.table, &result.report)?;
//! ```

mod generator;
mod summary;

pub use generator::{GeneratedReport, ReportGenerator};
pub use summary::{CleansingReport, ColumnSummary, ReportBuilder};
