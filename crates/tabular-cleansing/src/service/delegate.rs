//! Cleaning delegate trait and the in-process implementation.

use tracing::{debug, info};

use super::{CleaningOutput, PreprocessRequest};
use crate::config::CleansingConfig;
use crate::error::{CleansingError, Result};
use crate::io;
use crate::pipeline::{CancellationToken, Pipeline};

/// Something that turns a [`PreprocessRequest`] into cleaned output.
///
/// Implementations must return an error rather than a fabricated report
/// when cleaning did not happen.
pub trait CleaningDelegate: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Clean the request's CSV content.
    fn clean(&self, request: &PreprocessRequest) -> Result<CleaningOutput>;
}

/// Runs the pipeline in process.
#[derive(Debug, Clone, Default)]
pub struct LocalCleaner {
    base: CleansingConfig,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(LocalCleaner: Send, Sync);

impl LocalCleaner {
    /// Create a cleaner whose requests override `base`.
    pub fn new(base: CleansingConfig) -> Self {
        Self {
            base,
            cancellation_token: None,
        }
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn base_config(&self) -> &CleansingConfig {
        &self.base
    }
}

impl CleaningDelegate for LocalCleaner {
    fn name(&self) -> &str {
        "local"
    }

    fn clean(&self, request: &PreprocessRequest) -> Result<CleaningOutput> {
        let config = request.resolve_config(&self.base);
        config
            .validate()
            .map_err(|e| CleansingError::InvalidConfig(e.to_string()))?;

        let raw = io::read_csv_str(&request.csv_content, config.has_header)?;
        debug!("Request parsed: {} rows, {} columns", raw.height(), raw.width());

        let include_data = config.include_data;
        let mut builder = Pipeline::builder().config(config);
        if let Some(token) = &self.cancellation_token {
            builder = builder.cancellation_token(token.clone());
        }
        let result = builder.build()?.process(raw)?;

        info!(
            "Local cleaning done: {} samples in {}ms",
            result.report.samples, result.duration_ms
        );

        let (data, labels) = if include_data {
            (Some(result.feature_rows()), Some(result.labels()))
        } else {
            (None, None)
        };

        Ok(CleaningOutput {
            report: result.report,
            data,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutlierPolicy;
    use crate::service::RequestConfig;
    use crate::types::Cell;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_include_data_false_omits_rows() {
        let request = PreprocessRequest::new("x,y\n1,0\n2,1\n").with_config(RequestConfig {
            include_data: Some(false),
            ..Default::default()
        });
        let output = LocalCleaner::default().clean(&request).unwrap();
        assert!(output.data.is_none());
        assert!(output.labels.is_none());
        assert_eq!(output.report.samples, 2);
    }

    #[test]
    fn test_base_config_is_overridden_per_request() {
        let cleaner = LocalCleaner::new(
            CleansingConfig::builder()
                .outlier_policy(OutlierPolicy::Drop)
                .build()
                .unwrap(),
        );
        let request = PreprocessRequest::new("x,y\n1,0\n2,1\n3,0\n").with_config(RequestConfig {
            outlier_policy: Some(OutlierPolicy::Replace),
            ..Default::default()
        });
        let output = cleaner.clean(&request).unwrap();
        assert_eq!(output.report.outlier_policy, OutlierPolicy::Replace);
        assert_eq!(cleaner.base_config().outlier_policy, OutlierPolicy::Drop);
    }

    #[test]
    fn test_categorical_codes_in_data() {
        let request = PreprocessRequest::new("color,y\nred,0\nblue,1\nred,0\n");
        let output = LocalCleaner::default().clean(&request).unwrap();
        let data = output.data.unwrap();
        assert_eq!(
            data,
            vec![
                vec![Cell::Number(0.0)],
                vec![Cell::Number(1.0)],
                vec![Cell::Number(0.0)],
            ]
        );
        assert_eq!(output.labels, Some(vec![Some(0.0), Some(1.0), Some(0.0)]));
    }

    #[test]
    fn test_cancelled_token_fails_request() {
        let token = CancellationToken::new();
        token.cancel();
        let cleaner = LocalCleaner::default().with_cancellation_token(token);
        let err = cleaner.clean(&PreprocessRequest::new("x,y\n1,0\n")).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_unknown_label_column_is_an_error() {
        let request = PreprocessRequest::new("x,y\n1,0\n").with_config(RequestConfig {
            label_column: Some("target".to_string()),
            ..Default::default()
        });
        let err = LocalCleaner::default().clean(&request).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}
