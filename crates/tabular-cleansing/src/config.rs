//! Configuration types for the cleansing pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::ColumnKind;

/// Default strings treated as a missing cell during classification.
pub const DEFAULT_MISSING_MARKERS: [&str; 4] = ["NA", "N/A", "NaN", "null"];

/// Base name used for exported files when no output name is configured.
pub const DEFAULT_OUTPUT_NAME: &str = "cleaned_dataset";

/// How out-of-bound numeric cells are neutralized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierPolicy {
    /// Replace each out-of-bound cell with the midpoint of Q1 and Q3.
    #[default]
    Replace,
    /// Remove every row holding at least one out-of-bound feature value.
    Drop,
}

impl OutlierPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Drop => "drop",
        }
    }
}

/// How numeric feature columns are rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NormalizationMethod {
    /// `(x - mean) / std_dev`, with a divisor of 1 for constant columns.
    #[default]
    #[serde(rename = "zscore", alias = "z_score", alias = "zScore")]
    ZScore,
    /// `(x - min) / (max - min)`, with constant columns mapped to 0.
    #[serde(rename = "minmax", alias = "min_max", alias = "minMax")]
    MinMax,
}

impl NormalizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZScore => "zscore",
            Self::MinMax => "minmax",
        }
    }
}

/// How missing numeric feature cells are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MissingValueStrategy {
    /// Fill with the column mean.
    #[default]
    #[serde(rename = "impute")]
    Impute,
    /// Drop any row with a missing numeric feature or a missing label.
    #[serde(rename = "drop_rows", alias = "dropRows")]
    DropRows,
}

impl MissingValueStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impute => "impute",
            Self::DropRows => "drop_rows",
        }
    }
}

/// What happens to rows whose label cell is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingLabelPolicy {
    /// Keep the row; the label is reported as absent.
    #[default]
    Keep,
    /// Remove the row before any statistics are computed.
    Drop,
}

impl MissingLabelPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Drop => "drop",
        }
    }
}

/// Configuration for the cleansing pipeline.
///
/// Use [`CleansingConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_cleansing::config::{CleansingConfig, OutlierPolicy};
///
/// let config = CleansingConfig::builder()
///     .outlier_policy(OutlierPolicy::Drop)
///     .label_column("species")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleansingConfig {
    /// Policy for out-of-bound numeric cells.
    /// Default: Replace
    pub outlier_policy: OutlierPolicy,

    /// Rescaling applied after outlier resolution.
    /// Default: ZScore
    pub normalization: NormalizationMethod,

    /// Handling of missing numeric feature cells.
    /// Default: Impute
    pub missing_values: MissingValueStrategy,

    /// Handling of rows with a missing label.
    /// Default: Keep
    pub missing_labels: MissingLabelPolicy,

    /// Explicit label column. If None, the last column is the label.
    /// Default: None
    pub label_column: Option<String>,

    /// Raw strings that count as a missing cell (compared trimmed, case-insensitive).
    /// Default: NA, N/A, NaN, null
    pub missing_markers: Vec<String>,

    /// Column kinds forced regardless of what the classifier would infer.
    /// Only `Numeric` and `Categorical` may be forced.
    /// Default: empty
    pub forced_kinds: BTreeMap<String, ColumnKind>,

    /// Whether the first CSV record is a header row.
    /// Default: true
    pub has_header: bool,

    /// Whether responses carry the cleaned rows and labels.
    /// Default: true
    pub include_data: bool,

    /// Output directory for the report and cleaned CSV.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// If None, uses "cleaned_dataset".
    /// Default: None
    pub output_name: Option<String>,

    /// Whether to write the report and cleaned CSV to disk.
    /// Default: false
    pub save_to_disk: bool,
}

impl Default for CleansingConfig {
    fn default() -> Self {
        Self {
            outlier_policy: OutlierPolicy::default(),
            normalization: NormalizationMethod::default(),
            missing_values: MissingValueStrategy::default(),
            missing_labels: MissingLabelPolicy::default(),
            label_column: None,
            missing_markers: default_missing_markers(),
            forced_kinds: BTreeMap::new(),
            has_header: true,
            include_data: true,
            output_dir: PathBuf::from("output"),
            output_name: None,
            save_to_disk: false,
        }
    }
}

fn default_missing_markers() -> Vec<String> {
    DEFAULT_MISSING_MARKERS.iter().map(|m| m.to_string()).collect()
}

impl CleansingConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleansingConfigBuilder {
        CleansingConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(label) = &self.label_column
            && label.trim().is_empty()
        {
            return Err(ConfigValidationError::EmptyLabelColumn);
        }

        if let Some(name) = &self.output_name {
            if name.trim().is_empty() {
                return Err(ConfigValidationError::InvalidOutputName(name.clone()));
            }
            if name.contains('/') || name.contains('\\') {
                return Err(ConfigValidationError::InvalidOutputName(name.clone()));
            }
        }

        for (column, kind) in &self.forced_kinds {
            if *kind == ColumnKind::Label {
                return Err(ConfigValidationError::ForcedLabelKind(column.clone()));
            }
        }

        Ok(())
    }

    /// File stem used for exported artifacts.
    pub fn output_stem(&self) -> &str {
        self.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME)
    }

    /// Whether a raw cell string is one of the configured missing markers.
    pub fn is_missing_marker(&self, raw: &str) -> bool {
        crate::utils::is_missing_marker(raw, &self.missing_markers)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Label column name must not be empty")]
    EmptyLabelColumn,

    #[error("Invalid output name '{0}' (must be a non-empty file stem without path separators)")]
    InvalidOutputName(String),

    #[error("Column '{0}' cannot be forced to the Label kind (use label_column instead)")]
    ForcedLabelKind(String),
}

/// Builder for [`CleansingConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleansingConfigBuilder {
    outlier_policy: Option<OutlierPolicy>,
    normalization: Option<NormalizationMethod>,
    missing_values: Option<MissingValueStrategy>,
    missing_labels: Option<MissingLabelPolicy>,
    label_column: Option<String>,
    missing_markers: Option<Vec<String>>,
    forced_kinds: BTreeMap<String, ColumnKind>,
    has_header: Option<bool>,
    include_data: Option<bool>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    save_to_disk: Option<bool>,
}

impl CleansingConfigBuilder {
    /// Set the outlier policy.
    pub fn outlier_policy(mut self, policy: OutlierPolicy) -> Self {
        self.outlier_policy = Some(policy);
        self
    }

    /// Set the normalization method.
    pub fn normalization(mut self, method: NormalizationMethod) -> Self {
        self.normalization = Some(method);
        self
    }

    /// Set the missing numeric value strategy.
    pub fn missing_values(mut self, strategy: MissingValueStrategy) -> Self {
        self.missing_values = Some(strategy);
        self
    }

    /// Set the policy for rows with a missing label.
    pub fn missing_labels(mut self, policy: MissingLabelPolicy) -> Self {
        self.missing_labels = Some(policy);
        self
    }

    /// Set an explicit label column.
    ///
    /// If not set, the last column is used.
    pub fn label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    /// Replace the set of missing markers.
    pub fn missing_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Force the kind of one column.
    pub fn force_kind(mut self, column: impl Into<String>, kind: ColumnKind) -> Self {
        self.forced_kinds.insert(column.into(), kind);
        self
    }

    /// Declare whether the CSV input has a header row.
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    /// Include cleaned rows and labels in responses.
    pub fn include_data(mut self, include: bool) -> Self {
        self.include_data = Some(include);
        self
    }

    /// Set the output directory for reports and cleaned data.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Enable or disable saving the report and cleaned data to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleansingConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleansingConfig, ConfigValidationError> {
        let config = CleansingConfig {
            outlier_policy: self.outlier_policy.unwrap_or_default(),
            normalization: self.normalization.unwrap_or_default(),
            missing_values: self.missing_values.unwrap_or_default(),
            missing_labels: self.missing_labels.unwrap_or_default(),
            label_column: self.label_column,
            missing_markers: self.missing_markers.unwrap_or_else(default_missing_markers),
            forced_kinds: self.forced_kinds,
            has_header: self.has_header.unwrap_or(true),
            include_data: self.include_data.unwrap_or(true),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("output")),
            output_name: self.output_name,
            save_to_disk: self.save_to_disk.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}
