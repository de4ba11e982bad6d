use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::Result;

struct Entry<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

/// Single-value in-memory cache with a fixed time-to-live.
///
/// Refresh is lazy: the first caller after expiry runs the loader, and the
/// new value replaces the old one wholesale. Readers never observe a
/// partially written entry.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: RwLock<Option<Entry<T>>>,
    refresh: Mutex<()>,
}

impl<T> TtlCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    async fn fresh(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Cached value if still fresh, otherwise the result of `load`.
    ///
    /// A failed load leaves the previous entry untouched and returns the error.
    #[tracing::instrument(name = "ttl_cache", level = "debug", skip_all)]
    pub async fn get_or_refresh<F, Fut>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.fresh().await {
            tracing::debug!("Entry found and still fresh");
            return Ok(value);
        }

        // One loader at a time; callers queued behind it reuse its result.
        let _guard = self.refresh.lock().await;
        if let Some(value) = self.fresh().await {
            return Ok(value);
        }

        tracing::debug!("Entry missing or expired, refreshing");
        let value = Arc::new(load().await?);
        *self.slot.write().await = Some(Entry {
            value: Arc::clone(&value),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }
}
