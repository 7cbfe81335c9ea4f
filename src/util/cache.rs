//! Response cache with TTL and insertion-order eviction.
//!
//! Eviction is first-in-first-out: when the cache is full the entry that
//! was inserted earliest goes, however recently it was read. Reads never
//! reorder entries, and overwriting a key keeps its original position.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Capacity used by the API client.
pub const DEFAULT_CAPACITY: usize = 100;

/// How often the API client sweeps expired entries.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A cached value and its lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: Instant,
    /// Always `timestamp + cache_time`.
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: T, cache_time: Duration) -> Self {
        let timestamp = Instant::now();
        Self {
            data,
            timestamp,
            expires_at: timestamp + cache_time,
        }
    }

    /// An entry is valid up to and including its expiry instant.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
}

struct CacheInner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<T> CacheInner<T> {
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self.order.pop_front()?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

/// Bounded, time-expiring key/value store for successful GET responses.
pub struct RequestCache<T> {
    inner: Arc<Mutex<CacheInner<T>>>,
}

impl<T> Clone for RequestCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Default for RequestCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: Clone> RequestCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                capacity: capacity.max(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<T>> {
        lock_inner(&self.inner)
    }

    /// Store `data` under `key` for `cache_time`.
    ///
    /// A full cache first drops its earliest-inserted entry, even when
    /// `key` is already present.
    pub fn set(&self, key: impl Into<String>, data: T, cache_time: Duration) {
        let key = key.into();
        let mut inner = self.lock();

        if inner.entries.len() >= inner.capacity {
            if let Some(evicted) = inner.evict_oldest() {
                tracing::trace!(key = %evicted, "evicted oldest cache entry");
            }
        }

        let entry = CacheEntry::new(data, cache_time);
        if inner.entries.insert(key.clone(), entry).is_none() {
            inner.order.push_back(key);
        }
    }

    /// Get a cached value, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.lock();
        let valid = inner.entries.get(key)?.is_valid_at(Instant::now());
        if valid {
            inner.entries.get(key).map(|e| e.data.clone())
        } else {
            inner.remove(key);
            None
        }
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let mut inner = self.lock();
        let now = Instant::now();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.is_valid_at(now));
        let CacheInner { entries, order, .. } = &mut *inner;
        order.retain(|k| entries.contains_key(k));
        before - inner.entries.len()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Current number of entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            capacity: inner.capacity,
        }
    }
}

impl<T: Clone + Send + 'static> RequestCache<T> {
    /// Sweep expired entries every `interval` on the current Tokio
    /// runtime. The task only holds a weak reference and ends once every
    /// handle to the cache is gone. Returns `None` outside a runtime or
    /// when `interval` is zero.
    pub fn spawn_cleanup(&self, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            tracing::warn!("cache cleanup interval is zero; periodic sweep disabled");
            return None;
        }
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let weak: Weak<Mutex<CacheInner<T>>> = Arc::downgrade(&self.inner);
        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let removed = RequestCache { inner }.cleanup();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            }
        }))
    }
}

fn lock_inner<T>(inner: &Mutex<CacheInner<T>>) -> MutexGuard<'_, CacheInner<T>> {
    inner
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
