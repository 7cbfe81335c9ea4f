//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use claimwise::client::ApiClient;
use claimwise::config::ClientConfig;
use claimwise::reporting::{ConnectivityState, ErrorLogger, MemoryErrorSink};
use claimwise::types::RequestConfig;

pub struct TestClient {
    pub client: ApiClient,
    pub logger: Arc<ErrorLogger>,
    pub sink: Arc<MemoryErrorSink>,
}

/// Client pointed at `base_url` whose logger never flushes on its own,
/// so tests can inspect exactly what was queued.
pub fn test_client(base_url: &str) -> TestClient {
    let sink = Arc::new(MemoryErrorSink::new());
    let logger = Arc::new(ErrorLogger::new(
        sink.clone(),
        Arc::new(ConnectivityState::online()),
        false,
    ));
    let client = ApiClient::new(ClientConfig::new(base_url), logger.clone());
    TestClient {
        client,
        logger,
        sink,
    }
}

/// Request config with fast retries for tests that exercise backoff.
pub fn fast_retries(retries: u32) -> RequestConfig {
    RequestConfig {
        retries,
        retry_delay: Duration::from_millis(10),
        ..Default::default()
    }
}
