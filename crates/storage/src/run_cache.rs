//! Explicit cache of fetched source data.
//!
//! A backtest evaluates many dates against the same static sources. The cache
//! is owned by the caller and passed in, so its lifetime is obvious and two
//! runs never share state by accident.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::debug;

/// Key for one cached source fetch.
///
/// `date` is `None` for sources that do not change with the request date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunCacheKey {
    pub source: String,
    pub date: Option<NaiveDate>,
}

impl RunCacheKey {
    pub fn static_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            date: None,
        }
    }

    pub fn dated(source: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            source: source.into(),
            date: Some(date),
        }
    }
}

/// Cache of values keyed by [`RunCacheKey`], safe to share between tasks.
pub struct RunCache<V> {
    entries: Mutex<HashMap<RunCacheKey, Arc<V>>>,
}

impl<V> Default for RunCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> RunCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &RunCacheKey) -> Option<Arc<V>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: RunCacheKey, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.lock().await.insert(key, Arc::clone(&value));
        value
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Return the cached value, or compute it with `fetch` and cache it.
    ///
    /// Errors are returned as-is and nothing is cached for them.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: RunCacheKey, fetch: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            debug!(source = %key.source, date = ?key.date, "Run cache hit");
            return Ok(value);
        }

        let value = fetch().await?;
        Ok(self.insert(key, value).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_static_source_fetched_once() {
        let cache: RunCache<Vec<f32>> = RunCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with(RunCacheKey::static_source("bnpb-inarisk-flood-risk-index"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(vec![1.0, 2.0])
                })
                .await
                .unwrap();
            assert_eq!(*value, vec![1.0, 2.0]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dates_are_distinct_keys() {
        let cache: RunCache<u32> = RunCache::new();
        let d1 = NaiveDate::from_ymd_opt(2021, 2, 20).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2021, 2, 21).unwrap();

        cache.insert(RunCacheKey::dated("chirps-historical-rain-data", d1), 1).await;
        cache.insert(RunCacheKey::dated("chirps-historical-rain-data", d2), 2).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(
            cache.get(&RunCacheKey::dated("chirps-historical-rain-data", d2)).await.as_deref(),
            Some(&2)
        );
        assert!(cache.get(&RunCacheKey::static_source("chirps-historical-rain-data")).await.is_none());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: RunCache<u32> = RunCache::new();
        let key = RunCacheKey::static_source("noaa-gfs-rain-data");

        let err = cache
            .get_or_try_insert_with(key.clone(), || async { Err::<u32, _>("offline") })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty().await);
    }
}
