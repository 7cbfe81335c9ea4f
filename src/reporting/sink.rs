//! Destinations for batches of error records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::error::{parse_api_error, parse_network_error, ClaimWiseError, ErrorRecord};
use crate::types::ResponseBody;

/// Path of the backend's error intake endpoint.
pub const DEFAULT_LOG_ENDPOINT: &str = "/api/logs/errors";

/// Upload timeout for [`HttpErrorSink::new`].
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Where flushed error batches go.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn send(&self, batch: &[ErrorRecord]) -> Result<(), ClaimWiseError>;
}

#[derive(Serialize)]
struct ErrorBatch<'a> {
    errors: &'a [ErrorRecord],
}

/// Posts `{"errors": [...]}` to the backend's logging endpoint.
///
/// Sends through its own transport, never through the API client, so
/// upload failures are not queued again.
#[derive(Debug, Clone)]
pub struct HttpErrorSink {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpErrorSink {
    /// Sink whose uploads give up after [`DEFAULT_SINK_TIMEOUT`].
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, DEFAULT_SINK_TIMEOUT)
    }

    /// Sink whose uploads give up after `timeout`, so a hung endpoint
    /// hands the batch back to the logger instead of holding it.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to build error sink client; using defaults");
                reqwest::Client::new()
            });
        Self::with_client(http, endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ErrorSink for HttpErrorSink {
    async fn send(&self, batch: &[ErrorRecord]) -> Result<(), ClaimWiseError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ErrorBatch { errors: batch })
            .send()
            .await
            .map_err(|e| parse_network_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.unwrap_or_default();
        let body = ResponseBody::parse(content_type.as_deref(), &bytes)
            .unwrap_or_else(|_| ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned()));
        Err(parse_api_error(status.as_u16(), &headers, &body))
    }
}

/// In-memory sink that records every delivered batch.
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    batches: Mutex<Vec<Vec<ErrorRecord>>>,
    failing: AtomicBool,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<ErrorRecord>> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Every delivered record, oldest first.
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl ErrorSink for MemoryErrorSink {
    async fn send(&self, batch: &[ErrorRecord]) -> Result<(), ClaimWiseError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClaimWiseError::network("error sink unavailable"));
        }
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(batch.to_vec());
        Ok(())
    }
}
