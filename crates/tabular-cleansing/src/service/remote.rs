//! Delegate that forwards requests to an external cleaning service.
//!
//! The service receives the [`PreprocessRequest`] as JSON and must answer
//! with a [`PreprocessResponse`] body. Anything else (transport errors,
//! non-2xx statuses, bodies that do not parse, explicit failure bodies) is
//! surfaced as [`CleansingError::Upstream`] carrying the raw body, so a
//! caller never sees a placeholder report for a run that did not happen.

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CleaningDelegate, CleaningOutput, PreprocessRequest, PreprocessResponse};
use crate::error::{CleansingError, Result};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound on the body excerpt kept in error details.
const MAX_DETAILS_LEN: usize = 4096;

/// Configuration for [`RemoteCleaner`].
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Full URL the request is POSTed to.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional bearer token.
    pub api_key: Option<String>,
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Cleaning delegate backed by an HTTP service.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_cleansing::service::{handle_request, RemoteCleaner, RemoteConfig};
///
/// let cleaner = RemoteCleaner::with_config(
///     RemoteConfig::new("http://localhost:8000/preprocess").timeout_secs(120),
/// )?;
/// let response = handle_request(&cleaner, &request);
/// ```
pub struct RemoteCleaner {
    config: RemoteConfig,
    client: Client,
}

static_assertions::assert_impl_all!(RemoteCleaner: Send, Sync);

impl RemoteCleaner {
    /// Create a cleaner for `endpoint` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_config(RemoteConfig::new(endpoint))
    }

    pub fn with_config(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CleansingError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn call_service(&self, request: &PreprocessRequest) -> Result<(reqwest::StatusCode, String)> {
        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.json(request).send().map_err(|e| {
            CleansingError::upstream(
                format!("request to {} failed", self.config.endpoint),
                e.to_string(),
            )
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            CleansingError::upstream("could not read upstream response", e.to_string())
        })?;
        Ok((status, body))
    }
}

impl CleaningDelegate for RemoteCleaner {
    fn name(&self) -> &str {
        "remote"
    }

    fn clean(&self, request: &PreprocessRequest) -> Result<CleaningOutput> {
        debug!("Forwarding request to {}", self.config.endpoint);
        let (status, body) = self.call_service(request)?;

        if !status.is_success() {
            warn!("Upstream returned {}", status);
            return Err(CleansingError::upstream(
                format!("upstream returned status {}", status),
                excerpt(&body),
            ));
        }

        match serde_json::from_str::<PreprocessResponse>(&body) {
            Ok(PreprocessResponse::Success(output)) => Ok(output),
            Ok(PreprocessResponse::Failure(failure)) => Err(CleansingError::upstream(
                failure.error,
                failure.details.unwrap_or_else(|| excerpt(&body)),
            )),
            Err(e) => {
                warn!("Upstream body did not parse: {}", e);
                Err(CleansingError::upstream(
                    "upstream returned invalid structured output",
                    excerpt(&body),
                ))
            }
        }
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= MAX_DETAILS_LEN {
        return body.to_string();
    }
    let mut end = MAX_DETAILS_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
