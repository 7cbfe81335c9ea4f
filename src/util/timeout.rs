//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::ClaimWiseError;

/// Wrap a future with a timeout; `on_elapsed` builds the error reported
/// when the deadline passes first. The inner future is dropped, which
/// aborts any in-flight request it owns.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ClaimWiseError>>,
    on_elapsed: impl FnOnce(Duration) -> ClaimWiseError,
) -> Result<T, ClaimWiseError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed(duration)),
    }
}
