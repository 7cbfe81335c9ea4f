//! Resilient HTTP client for the ClaimWise backend.
//!
//! Every logical request runs through [`ApiClient::request`]: cacheable GETs
//! are answered from the [`RequestCache`] when possible; otherwise each
//! attempt sends the request under a timeout, classifies any failure into a
//! [`ClaimWiseError`], reports it to the [`ErrorLogger`], and the retry loop
//! decides whether to back off and try again.
//!
//! Concurrent identical GETs are not coalesced: each one checks the cache
//! on its own and, on a miss, performs its own network call.

pub mod http;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::parse::trace_id_from;
use crate::error::{
    parse_api_error, parse_network_error, ClaimWiseError, ErrorCategory, ErrorSeverity, Result,
};
use crate::reporting::{ConnectivityState, ErrorLogger, HttpErrorSink};
use crate::types::{
    ApiResponse, FilePart, HttpMethod, MultipartForm, RequestBody, RequestConfig, ResponseBody,
};
use crate::util::cache::{CacheStats, RequestCache};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

use self::http::RawResponse;

/// Path probed by [`ApiClient::health_check`].
pub const HEALTH_PATH: &str = "/healthz";

/// Timeout for the health probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// A successful response as stored in the request cache.
#[derive(Debug, Clone)]
struct CachedResponse {
    body: ResponseBody,
    status: u16,
    status_text: String,
    headers: HeaderMap,
    trace_id: Option<String>,
}

impl CachedResponse {
    fn to_response<T: DeserializeOwned>(
        &self,
        cached: bool,
        response_time: Duration,
        url: &str,
    ) -> Result<ApiResponse<T>> {
        // Not retryable: the request itself already succeeded.
        let data = self.body.decode::<T>().map_err(|e| {
            ClaimWiseError::new(
                ErrorCategory::Validation,
                ErrorSeverity::Medium,
                format!("Failed to decode response body: {e}"),
            )
            .with_context(json!({ "url": url, "status": self.status, "cached": cached }))
            .with_trace_id(self.trace_id.clone())
        })?;
        Ok(ApiResponse {
            data,
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            cached,
            response_time,
            trace_id: self.trace_id.clone(),
        })
    }
}

/// Client-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStats {
    /// Requests put on the wire so far (cache hits excluded).
    pub request_count: u64,
    pub cache: CacheStats,
}

/// Typed HTTP client with caching, timeouts, retries, and error reporting.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    default_headers: RwLock<HashMap<String, String>>,
    cache: RequestCache<CachedResponse>,
    request_counter: AtomicU64,
    logger: Arc<ErrorLogger>,
    cleanup: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("request_count", &self.request_counter.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client that reports errors to `logger`.
    ///
    /// When called inside a Tokio runtime this also starts the periodic
    /// cache sweep, which ends when the client is dropped.
    pub fn new(config: ClientConfig, logger: Arc<ErrorLogger>) -> Self {
        Self::with_http_client(reqwest::Client::new(), config, logger)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        config: ClientConfig,
        logger: Arc<ErrorLogger>,
    ) -> Self {
        let cache = RequestCache::new(config.cache_capacity);
        let cleanup = cache.spawn_cleanup(config.cleanup_interval);
        Self {
            http,
            default_headers: RwLock::new(http::default_headers()),
            cache,
            request_counter: AtomicU64::new(0),
            logger,
            cleanup,
            config,
        }
    }

    /// Build a client whose errors are posted to the backend's error sink,
    /// assuming the network is up.
    pub fn with_default_logger(config: ClientConfig) -> Self {
        let sink = Arc::new(HttpErrorSink::new(config.log_url()));
        let logger = ErrorLogger::spawn(
            sink,
            Arc::new(ConnectivityState::online()),
            config.development,
        );
        Self::new(config, logger)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn logger(&self) -> &Arc<ErrorLogger> {
        &self.logger
    }

    /// Send `Authorization: Bearer <token>` on every later request.
    pub fn set_auth_token(&self, token: &str) {
        self.headers_mut()
            .insert("Authorization".to_string(), http::bearer_value(token));
    }

    pub fn clear_auth_token(&self) {
        self.headers_mut().remove("Authorization");
    }

    pub fn auth_token(&self) -> Option<String> {
        self.headers()
            .get("Authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            request_count: self.request_counter.load(Ordering::SeqCst),
            cache: self.cache.stats(),
        }
    }

    fn headers(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.default_headers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn headers_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.default_headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issue a request, retrying transient failures with exponential
    /// backoff.
    ///
    /// Authentication and validation failures are returned at once; other
    /// failures are retried until `config.retries` attempts have run.
    pub async fn request<T: DeserializeOwned>(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        let policy = RetryPolicy::new(config.retries, config.retry_delay);
        let config = &config;
        policy
            .execute(move |attempt| self.execute_request(url, config, attempt))
            .await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        self.request(
            url,
            RequestConfig {
                method: HttpMethod::Get,
                ..config
            },
        )
        .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        self.send_with_body(HttpMethod::Post, url, body, config).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        self.send_with_body(HttpMethod::Put, url, body, config).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        self.send_with_body(HttpMethod::Patch, url, body, config).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        self.request(
            url,
            RequestConfig {
                method: HttpMethod::Delete,
                ..config
            },
        )
        .await
    }

    async fn send_with_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        let body = RequestBody::json(body).map_err(|e| {
            let error = ClaimWiseError::validation(
                format!("Request body could not be serialized: {e}"),
                None,
            );
            self.logger.log_error(&error);
            error
        })?;
        self.request(
            url,
            RequestConfig {
                method,
                body: Some(body),
                ..config
            },
        )
        .await
    }

    /// Upload a file as multipart form data alongside `fields`.
    /// Uploads are never cached.
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        url: &str,
        file: FilePart,
        fields: impl IntoIterator<Item = (String, String)>,
        config: RequestConfig,
    ) -> Result<ApiResponse<T>> {
        let form = fields
            .into_iter()
            .fold(MultipartForm::new().file(UPLOAD_FIELD, file), |form, (name, value)| {
                form.text(name, value)
            });
        self.request(
            url,
            RequestConfig {
                method: HttpMethod::Post,
                body: Some(RequestBody::Multipart(form)),
                cache: Some(false),
                ..config
            },
        )
        .await
    }

    /// Probe `/healthz` once, uncached. Any 200 counts as healthy; every
    /// failure yields `false`.
    pub async fn health_check(&self) -> bool {
        let config = RequestConfig {
            timeout: Some(HEALTH_TIMEOUT),
            retries: 1,
            cache: Some(false),
            ..Default::default()
        };
        matches!(
            self.request::<serde_json::Value>(HEALTH_PATH, config).await,
            Ok(response) if response.status == 200
        )
    }

    /// One attempt; any error it produces is reported exactly once here.
    async fn execute_request<T: DeserializeOwned>(
        &self,
        url: &str,
        config: &RequestConfig,
        attempt: u32,
    ) -> Result<ApiResponse<T>> {
        let result = self.perform(url, config, attempt).await;
        if let Err(error) = &result {
            self.logger.log_error(error);
        }
        result
    }

    async fn perform<T: DeserializeOwned>(
        &self,
        url: &str,
        config: &RequestConfig,
        attempt: u32,
    ) -> Result<ApiResponse<T>> {
        let url = self.config.resolve_url(url);

        let cache_key = config
            .is_cacheable()
            .then(|| http::cache_key(config.method, &url, config.body.as_ref()));
        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key) {
                debug!(url = %url, "cache hit");
                return hit.to_response(true, Duration::ZERO, &url);
            }
        }

        let counter = self.request_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = http::request_id(counter);
        let boundary = config
            .body
            .as_ref()
            .filter(|body| body.is_multipart())
            .map(|_| http::multipart_boundary());
        let headers = {
            let defaults = self.headers();
            http::build_headers(
                &defaults,
                &config.headers,
                &request_id,
                attempt,
                boundary.as_deref(),
            )?
        };

        let mut builder = self
            .http
            .request(config.method.into(), &url)
            .headers(headers);
        builder = match (&config.body, &boundary) {
            (Some(RequestBody::Json(value)), _) => builder.body(value.to_string()),
            (Some(RequestBody::Multipart(form)), Some(boundary)) => {
                builder.body(form.encode(boundary))
            }
            _ => builder,
        };

        debug!(
            method = %config.method,
            url = %url,
            attempt,
            request_id = %request_id,
            "sending request"
        );

        let timeout = config.timeout.unwrap_or(self.config.default_timeout);
        let started = Instant::now();
        let raw = with_timeout(
            timeout,
            async {
                let response = builder
                    .send()
                    .await
                    .map_err(|e| classify_transport_error(&e, &url, attempt))?;
                RawResponse::read(response)
                    .await
                    .map_err(|e| classify_transport_error(&e, &url, attempt))
            },
            |elapsed| timeout_error(&url, elapsed, attempt),
        )
        .await?;
        let response_time = started.elapsed();

        let body = raw.body().map_err(|e| {
            ClaimWiseError::network(format!("Failed to parse response body: {e}"))
                .with_context(json!({ "url": url, "attempt": attempt }))
                .with_trace_id(trace_id_from(&raw.headers))
        })?;

        if !raw.status.is_success() {
            return Err(parse_api_error(raw.status.as_u16(), &raw.headers, &body));
        }

        let cached = CachedResponse {
            trace_id: trace_id_from(&raw.headers),
            status: raw.status.as_u16(),
            status_text: raw.status.canonical_reason().unwrap_or_default().to_string(),
            headers: raw.headers,
            body,
        };
        let response = cached.to_response(false, response_time, &url)?;
        if let Some(key) = cache_key {
            self.cache.set(key, cached, config.cache_time);
        }
        Ok(response)
    }
}

impl Drop for ApiClient {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
        }
    }
}

fn timeout_error(url: &str, timeout: Duration, attempt: u32) -> ClaimWiseError {
    let timeout_ms = timeout.as_millis() as u64;
    ClaimWiseError::network(format!("Request timeout after {timeout_ms}ms"))
        .with_context(json!({ "url": url, "timeout": timeout_ms, "attempt": attempt }))
}

/// Connection-level failures go through the network parser; anything
/// else the transport reports becomes a generic network error.
fn classify_transport_error(error: &reqwest::Error, url: &str, attempt: u32) -> ClaimWiseError {
    if error.is_connect() || error.is_request() {
        parse_network_error(error)
    } else {
        ClaimWiseError::network(format!("Request failed: {error}"))
            .with_context(json!({ "url": url, "attempt": attempt }))
    }
}
