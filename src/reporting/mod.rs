//! Offline-aware error reporting.
//!
//! [`ErrorLogger`] buffers classified errors and ships them to an
//! [`ErrorSink`] in batches. While offline, errors accumulate; the first
//! transition back online triggers a flush. A failed flush puts the batch
//! back at the front of the queue, so nothing is dropped.

pub mod connectivity;
pub mod sink;

pub use connectivity::{Connectivity, ConnectivityState};
pub use sink::{
    ErrorSink, HttpErrorSink, MemoryErrorSink, DEFAULT_LOG_ENDPOINT, DEFAULT_SINK_TIMEOUT,
};

use std::backtrace::Backtrace;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::error::{ClaimWiseError, ErrorRecord};

/// Queue of classified errors awaiting delivery.
pub struct ErrorLogger {
    queue: Mutex<VecDeque<ClaimWiseError>>,
    sink: Arc<dyn ErrorSink>,
    connectivity: Arc<dyn Connectivity>,
    development: bool,
    wake: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ErrorLogger {
    /// Build a logger without a background worker; call [`flush`] yourself.
    ///
    /// [`flush`]: ErrorLogger::flush
    pub fn new(
        sink: Arc<dyn ErrorSink>,
        connectivity: Arc<dyn Connectivity>,
        development: bool,
    ) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            sink,
            connectivity,
            development,
            wake: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        }
    }

    /// Build a logger and start its flush worker on the current runtime.
    ///
    /// The worker flushes after new errors arrive while online and on
    /// every offline-to-online transition. It stops when the logger is
    /// dropped.
    pub fn spawn(
        sink: Arc<dyn ErrorSink>,
        connectivity: Arc<dyn Connectivity>,
        development: bool,
    ) -> Arc<Self> {
        let logger = Arc::new(Self::new(sink, connectivity, development));
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let handle = runtime.spawn(run_worker(
                Arc::downgrade(&logger),
                Arc::clone(&logger.wake),
                logger.connectivity.subscribe(),
            ));
            *lock(&logger.worker) = Some(handle);
        } else {
            tracing::warn!("no async runtime; error logger will only flush on demand");
        }
        logger
    }

    pub fn is_development(&self) -> bool {
        self.development
    }

    /// Record an error. In development mode it is also dumped to the log.
    pub fn log_error(&self, error: &ClaimWiseError) {
        if self.development {
            dump(error);
        }
        lock(&self.queue).push_back(error.clone());
        if self.connectivity.is_online() {
            self.wake.notify_one();
        }
    }

    /// Number of errors waiting for delivery.
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Send everything queued as one batch. Returns how many were sent.
    ///
    /// Does nothing while offline. On failure the batch is restored ahead
    /// of anything logged during the attempt.
    pub async fn flush(&self) -> Result<usize, ClaimWiseError> {
        if !self.connectivity.is_online() {
            return Ok(0);
        }

        let batch: Vec<ClaimWiseError> = lock(&self.queue).drain(..).collect();
        if batch.is_empty() {
            return Ok(0);
        }

        let records: Vec<ErrorRecord> = batch.iter().map(ClaimWiseError::to_record).collect();
        match self.sink.send(&records).await {
            Ok(()) => {
                tracing::debug!(count = records.len(), "flushed error reports");
                Ok(records.len())
            }
            Err(e) => {
                tracing::warn!(
                    count = batch.len(),
                    error = %e,
                    "failed to flush error reports; requeued"
                );
                let mut queue = lock(&self.queue);
                for error in batch.into_iter().rev() {
                    queue.push_front(error);
                }
                Err(e)
            }
        }
    }
}

impl Drop for ErrorLogger {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.worker).take() {
            handle.abort();
        }
    }
}

async fn run_worker(
    logger: Weak<ErrorLogger>,
    wake: Arc<Notify>,
    mut online: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = wake.notified() => {}
            changed = online.changed() => {
                if changed.is_err() {
                    return;
                }
                if !*online.borrow_and_update() {
                    tracing::debug!("offline; holding error reports");
                    continue;
                }
            }
        }

        let Some(logger) = logger.upgrade() else {
            return;
        };
        // Failures are requeued and logged inside flush.
        let _ = logger.flush().await;
    }
}

fn dump(error: &ClaimWiseError) {
    let details = serde_json::to_string(error.details()).unwrap_or_default();
    tracing::error!(
        target: "claimwise::errors",
        error_name = %error.kind(),
        category = %error.category(),
        severity = %error.severity(),
        technical_message = error.technical_message(),
        user_message = error.user_message(),
        details = %details,
        trace_id = error.trace_id().unwrap_or("-"),
        backtrace = %Backtrace::capture(),
        "ClaimWise error"
    );
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn logger(sink: Arc<MemoryErrorSink>, state: &ConnectivityState) -> ErrorLogger {
        ErrorLogger::new(sink, Arc::new(state.clone()), false)
    }

    #[tokio::test]
    async fn flush_sends_queue_as_single_batch() {
        let sink = Arc::new(MemoryErrorSink::new());
        let state = ConnectivityState::online();
        let logger = logger(Arc::clone(&sink), &state);

        logger.log_error(&ClaimWiseError::network("a"));
        logger.log_error(&ClaimWiseError::authentication("b"));
        assert_eq!(logger.flush().await.unwrap(), 2);

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][1].category, ErrorCategory::Authentication);
        assert_eq!(logger.pending(), 0);
    }

    #[tokio::test]
    async fn failed_flush_requeues_ahead_of_new_errors() {
        let sink = Arc::new(MemoryErrorSink::new());
        let state = ConnectivityState::online();
        let logger = logger(Arc::clone(&sink), &state);

        logger.log_error(&ClaimWiseError::network("first"));
        sink.set_failing(true);
        assert!(logger.flush().await.is_err());
        logger.log_error(&ClaimWiseError::network("second"));

        sink.set_failing(false);
        logger.flush().await.unwrap();
        let messages: Vec<_> = sink.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn offline_flush_is_a_no_op() {
        let sink = Arc::new(MemoryErrorSink::new());
        let state = ConnectivityState::offline();
        let logger = logger(Arc::clone(&sink), &state);

        logger.log_error(&ClaimWiseError::network("queued"));
        assert_eq!(logger.flush().await.unwrap(), 0);
        assert_eq!(logger.pending(), 1);
        assert!(sink.batches().is_empty());
    }
}
