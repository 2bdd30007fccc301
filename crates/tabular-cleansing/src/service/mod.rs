//! Request/response boundary for cleansing uploaded CSV text.
//!
//! A [`PreprocessRequest`] carries raw CSV text and optional overrides. A
//! [`CleaningDelegate`] does the work, either in process ([`LocalCleaner`])
//! or through an external service (`RemoteCleaner`, feature `remote`).
//! [`handle_request`] turns the delegate's result into a
//! [`PreprocessResponse`]; failures are reported as `{error, details?}` and
//! never replaced with a default report.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabular_cleansing::service::{handle_request, LocalCleaner, PreprocessRequest, RequestConfig};
//!
//! let request = PreprocessRequest::new("1,2,0\n3,4,1\n5,6,0\n").with_config(RequestConfig {
//!     has_header: Some(false),
//!     ..Default::default()
//! });
//! let response = handle_request(&LocalCleaner::default(), &request);
//! println!("{}", serde_json::to_string(&response)?);
//! ```

mod delegate;
#[cfg(feature = "remote")]
mod remote;

pub use delegate::{CleaningDelegate, LocalCleaner};
#[cfg(feature = "remote")]
pub use remote::{RemoteCleaner, RemoteConfig};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{
    CleansingConfig, MissingLabelPolicy, MissingValueStrategy, NormalizationMethod, OutlierPolicy,
};
use crate::error::CleansingError;
use crate::reporting::CleansingReport;
use crate::types::Cell;

/// Optional per-request overrides of the cleansing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub outlier_policy: Option<OutlierPolicy>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub normalization: Option<NormalizationMethod>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub missing_values: Option<MissingValueStrategy>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub missing_labels: Option<MissingLabelPolicy>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub include_data: Option<bool>,
}

impl RequestConfig {
    /// Overlay these overrides on a base configuration.
    pub fn apply(&self, base: &CleansingConfig) -> CleansingConfig {
        let mut config = base.clone();
        if let Some(policy) = self.outlier_policy {
            config.outlier_policy = policy;
        }
        if let Some(method) = self.normalization {
            config.normalization = method;
        }
        if let Some(strategy) = self.missing_values {
            config.missing_values = strategy;
        }
        if let Some(policy) = self.missing_labels {
            config.missing_labels = policy;
        }
        if let Some(label) = &self.label_column {
            config.label_column = Some(label.clone());
        }
        if let Some(has_header) = self.has_header {
            config.has_header = has_header;
        }
        if let Some(include) = self.include_data {
            config.include_data = include;
        }
        config
    }

    /// Overrides that reproduce the behavior-relevant parts of `config`.
    pub fn from_config(config: &CleansingConfig) -> Self {
        Self {
            outlier_policy: Some(config.outlier_policy),
            normalization: Some(config.normalization),
            missing_values: Some(config.missing_values),
            missing_labels: Some(config.missing_labels),
            label_column: config.label_column.clone(),
            has_header: Some(config.has_header),
            include_data: Some(config.include_data),
        }
    }
}

/// Raw CSV text plus optional configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessRequest {
    pub csv_content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub config: Option<RequestConfig>,
}

impl PreprocessRequest {
    pub fn new(csv_content: impl Into<String>) -> Self {
        Self {
            csv_content: csv_content.into(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Effective configuration for this request on top of `base`.
    pub fn resolve_config(&self, base: &CleansingConfig) -> CleansingConfig {
        match &self.config {
            Some(overrides) => overrides.apply(base),
            None => base.clone(),
        }
    }
}

/// Successful cleansing output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningOutput {
    pub report: CleansingReport,
    /// Cleaned rows without the label, in column order.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Vec<Vec<Cell>>>,
    /// Label values; `null` where the label was missing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub labels: Option<Vec<Option<f64>>>,
}

/// Failure body returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
}

impl From<&CleansingError> for FailureBody {
    fn from(error: &CleansingError) -> Self {
        Self {
            error: error.to_string(),
            details: error.details().map(str::to_string),
            code: Some(error.error_code().to_string()),
        }
    }
}

/// Response envelope: either the cleaned output or a failure body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreprocessResponse {
    Success(CleaningOutput),
    Failure(FailureBody),
}

impl PreprocessResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn report(&self) -> Option<&CleansingReport> {
        match self {
            Self::Success(output) => Some(&output.report),
            Self::Failure(_) => None,
        }
    }
}

/// Run a request through a delegate and wrap the outcome.
pub fn handle_request(
    delegate: &dyn CleaningDelegate,
    request: &PreprocessRequest,
) -> PreprocessResponse {
    match delegate.clean(request) {
        Ok(output) => PreprocessResponse::Success(output),
        Err(e) => {
            warn!("Delegate '{}' failed: {}", delegate.name(), e);
            PreprocessResponse::Failure(FailureBody::from(&e))
        }
    }
}

/// Parse a JSON request body and handle it.
///
/// A body that is not a valid request yields a failure response.
pub fn handle_json(delegate: &dyn CleaningDelegate, body: &str) -> PreprocessResponse {
    match serde_json::from_str::<PreprocessRequest>(body) {
        Ok(request) => handle_request(delegate, &request),
        Err(e) => PreprocessResponse::Failure(FailureBody {
            error: "Invalid request body".to_string(),
            details: Some(e.to_string()),
            code: Some(CleansingError::Json(e).error_code().to_string()),
        }),
    }
}
