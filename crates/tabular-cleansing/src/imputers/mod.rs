//! Imputation module for handling missing values.
//!
//! This module provides the missing-value strategies:
//! - Mean imputation for numeric feature columns
//! - Row removal for incomplete rows or missing labels

mod statistical;

pub use statistical::{ImputationOutcome, StatisticalImputer};
