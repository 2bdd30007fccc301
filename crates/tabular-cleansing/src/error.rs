//! Error types for the cleansing pipeline.
//!
//! Only boundary failures (ingestion, configuration, upstream delegates) are
//! hard errors. Data-level problems such as malformed cells or empty columns
//! are absorbed by the stages and surfaced as report counters instead.
//!
//! Errors are serializable as `{code, message}` so they can be returned to a
//! caller over the request/response boundary.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleansing pipeline.
#[derive(Error, Debug)]
pub enum CleansingError {
    /// Pipeline was cancelled through its token.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Two columns share the same name.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A row does not have one cell per column.
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// CSV input could not be turned into a raw table.
    #[error("Failed to ingest CSV: {0}")]
    Ingestion(String),

    /// External cleaning delegate failed or returned unusable output.
    #[error("Upstream cleaning failed: {message}")]
    Upstream { message: String, details: String },

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// No data loaded in the session.
    #[error("No data loaded")]
    NoDataLoaded,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (remote delegate, only with "remote" feature).
    #[cfg(feature = "remote")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleansingError>,
    },
}

impl CleansingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleansingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build an upstream failure carrying the raw diagnostic text.
    pub fn upstream(message: impl Into<String>, details: impl Into<String>) -> Self {
        CleansingError::Upstream {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Get a stable error code for callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::DuplicateColumn(_) => "DUPLICATE_COLUMN",
            Self::RaggedRow { .. } => "RAGGED_ROW",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Ingestion(_) => "INGESTION_FAILED",
            Self::Upstream { .. } => "UPSTREAM_FAILURE",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::NoDataLoaded => "NO_DATA_LOADED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "remote")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Raw diagnostic text attached to the error, if any.
    ///
    /// Only upstream failures carry details; context wrappers are looked through.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Upstream { details, .. } => Some(details.as_str()),
            Self::WithContext { source, .. } => source.details(),
            _ => None,
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if this error is recoverable (i.e., not a fundamental failure).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::NoDataLoaded | Self::InvalidConfig(_)
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleansingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleansingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleansing operations.
pub type Result<T> = std::result::Result<T, CleansingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleansingError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleansingError::Io(e).with_context(context))
    }
}
