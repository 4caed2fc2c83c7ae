//! On-disk HTTP response cache.
//!
//! Entries live in one file per request signature under the cache directory,
//! prefixed with the time they were stored. Recently used entries are also
//! kept in an in-memory LRU so repeated reads within a run skip the disk.
//!
//! Writes go to a temporary file that is renamed into place, so concurrent
//! readers never observe a partially written entry.

use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::{Result, StorageError};

/// Responses older than this are refetched.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const DEFAULT_MEMORY_ENTRIES: usize = 64;
const HEADER_LEN: usize = 8;

/// Request signature used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash method, URL (including query string) and body into a key.
    pub fn new(method: &str, url: &str, body: &[u8]) -> Self {
        let mut signature = Vec::with_capacity(method.len() + url.len() + body.len() + 2);
        signature.extend_from_slice(method.to_ascii_uppercase().as_bytes());
        signature.push(b'\n');
        signature.extend_from_slice(url.as_bytes());
        signature.push(b'\n');
        signature.extend_from_slice(body);
        Self(format!("{:016x}", xxh3_64(&signature)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
struct CachedResponse {
    data: Bytes,
    stored_at: SystemTime,
}

impl CachedResponse {
    fn is_expired(&self, ttl: Duration) -> bool {
        SystemTime::now()
            .duration_since(self.stored_at)
            .map(|age| age >= ttl)
            .unwrap_or(false)
    }
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stale_served: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn stale_served(&self) -> u64 {
        self.stale_served.load(Ordering::Relaxed)
    }
}

/// Disk-backed response cache with TTL expiry and stale-if-error fallback.
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
    memory: Mutex<LruCache<String, CachedResponse>>,
    stats: Arc<CacheStats>,
    tmp_counter: AtomicU64,
}

impl ResponseCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let capacity = NonZeroUsize::new(DEFAULT_MEMORY_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            dir,
            ttl,
            memory: Mutex::new(LruCache::new(capacity)),
            stats: Arc::new(CacheStats::default()),
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Return the cached response for `key` if it exists and has not expired.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        let entry = self.lookup(key).await?;
        match entry {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.data))
            }
            _ => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Return the cached response for `key` regardless of its age.
    pub async fn get_stale(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        Ok(self.lookup(key).await?.map(|entry| entry.data))
    }

    /// Store a response.
    pub async fn put(&self, key: &CacheKey, data: Bytes) -> Result<()> {
        let stored_at = SystemTime::now();
        let millis = stored_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut contents = Vec::with_capacity(HEADER_LEN + data.len());
        contents.extend_from_slice(&millis.to_le_bytes());
        contents.extend_from_slice(&data);

        let tmp = self.dir.join(format!(
            "{}.{}.{}.tmp",
            key,
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, &contents).await?;
        tokio::fs::rename(&tmp, self.entry_path(key)).await?;

        self.memory
            .lock()
            .await
            .put(key.0.clone(), CachedResponse { data, stored_at });
        debug!(key = %key, "Stored response");
        Ok(())
    }

    /// Serve `key` from the cache, or run `fetch` and cache its result.
    ///
    /// When `fetch` fails and an expired entry exists, the expired entry is
    /// returned instead of the error.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &CacheKey, fetch: F) -> std::result::Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Bytes, E>>,
        E: From<StorageError> + std::fmt::Display,
    {
        if let Some(data) = self.get(key).await? {
            debug!(key = %key, "Response cache hit");
            return Ok(data);
        }

        match fetch().await {
            Ok(data) => {
                if let Err(e) = self.put(key, data.clone()).await {
                    warn!(key = %key, error = %e, "Failed to cache response");
                }
                Ok(data)
            }
            Err(err) => match self.get_stale(key).await? {
                Some(data) => {
                    warn!(key = %key, error = %err, "Request failed, serving stale cached response");
                    self.stats.stale_served.fetch_add(1, Ordering::Relaxed);
                    Ok(data)
                }
                None => Err(err),
            },
        }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.bin", key))
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        if let Some(entry) = self.memory.lock().await.get(&key.0) {
            return Ok(Some(entry.clone()));
        }

        let contents = match tokio::fs::read(self.entry_path(key)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if contents.len() < HEADER_LEN {
            // Truncated write; drop it so the next fetch replaces it.
            warn!(key = %key, len = contents.len(), "Discarding truncated cache entry");
            if let Err(e) = tokio::fs::remove_file(self.entry_path(key)).await {
                warn!(key = %key, error = %e, "Failed to remove truncated cache entry");
            }
            return Ok(None);
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&contents[..HEADER_LEN]);
        let stored_at = UNIX_EPOCH + Duration::from_millis(u64::from_le_bytes(header));
        let entry = CachedResponse {
            data: Bytes::copy_from_slice(&contents[HEADER_LEN..]),
            stored_at,
        };

        self.memory.lock().await.put(key.0.clone(), entry.clone());
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    enum TestError {
        Fetch,
        Storage(StorageError),
    }

    impl From<StorageError> for TestError {
        fn from(e: StorageError) -> Self {
            TestError::Storage(e)
        }
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Fetch => write!(f, "fetch failed"),
                TestError::Storage(e) => write!(f, "{}", e),
            }
        }
    }

    #[test]
    fn test_cache_key_is_stable() {
        let a = CacheKey::new("get", "https://example.org/a?x=1", b"");
        let b = CacheKey::new("GET", "https://example.org/a?x=1", b"");
        let c = CacheKey::new("POST", "https://example.org/a?x=1", b"");
        let d = CacheKey::new("POST", "https://example.org/a?x=1", b"pr=32");

        assert_eq!(a, b);
        assert_ne!(b, c);
        assert_ne!(c, d);
        assert_eq!(a.as_str().len(), 16);
    }

    #[tokio::test]
    async fn test_fresh_hit_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), DEFAULT_TTL).await.unwrap();
        let key = CacheKey::new("GET", "https://example.org/data", b"");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let data: std::result::Result<Bytes, TestError> = cache
                .get_or_fetch(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Bytes::from_static(b"payload"))
                })
                .await;
            assert_eq!(data.unwrap(), Bytes::from_static(b"payload"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::ZERO).await.unwrap();
        let key = CacheKey::new("GET", "https://example.org/data", b"");

        cache.put(&key, Bytes::from_static(b"old")).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());

        let data: std::result::Result<Bytes, TestError> = cache
            .get_or_fetch(&key, || async { Ok(Bytes::from_static(b"new")) })
            .await;
        assert_eq!(data.unwrap(), Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_stale_if_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), Duration::ZERO).await.unwrap();
        let key = CacheKey::new("GET", "https://example.org/data", b"");
        cache.put(&key, Bytes::from_static(b"stale")).await.unwrap();

        let data: std::result::Result<Bytes, TestError> = cache
            .get_or_fetch(&key, || async { Err(TestError::Fetch) })
            .await;
        assert_eq!(data.unwrap(), Bytes::from_static(b"stale"));
        assert_eq!(cache.stats().stale_served(), 1);
    }

    #[tokio::test]
    async fn test_error_without_cached_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), DEFAULT_TTL).await.unwrap();
        let key = CacheKey::new("GET", "https://example.org/missing", b"");

        let data: std::result::Result<Bytes, TestError> = cache
            .get_or_fetch(&key, || async { Err(TestError::Fetch) })
            .await;
        assert!(matches!(data, Err(TestError::Fetch)));
    }

    #[tokio::test]
    async fn test_truncated_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), DEFAULT_TTL).await.unwrap();
        let key = CacheKey::new("GET", "https://example.org/truncated", b"");
        std::fs::write(dir.path().join(format!("{}.bin", key)), b"abc").unwrap();

        let data: std::result::Result<Bytes, TestError> = cache
            .get_or_fetch(&key, || async { Ok(Bytes::from_static(b"fresh")) })
            .await;
        assert_eq!(data.unwrap(), Bytes::from_static(b"fresh"));

        let reopened = ResponseCache::open(dir.path(), DEFAULT_TTL).await.unwrap();
        assert_eq!(reopened.get(&key).await.unwrap(), Some(Bytes::from_static(b"fresh")));
    }

    #[tokio::test]
    async fn test_truncated_entry_is_not_served_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(dir.path(), DEFAULT_TTL).await.unwrap();
        let key = CacheKey::new("GET", "https://example.org/truncated", b"");
        let path = dir.path().join(format!("{}.bin", key));
        std::fs::write(&path, b"abc").unwrap();

        assert!(cache.get_stale(&key).await.unwrap().is_none());
        assert!(!path.exists());

        let data: std::result::Result<Bytes, TestError> = cache
            .get_or_fetch(&key, || async { Err(TestError::Fetch) })
            .await;
        assert!(matches!(data, Err(TestError::Fetch)));
    }

    #[tokio::test]
    async fn test_entries_persist_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheKey::new("GET", "https://example.org/data", b"");
        {
            let cache = ResponseCache::open(dir.path(), DEFAULT_TTL).await.unwrap();
            cache.put(&key, Bytes::from_static(b"persisted")).await.unwrap();
        }

        let reopened = ResponseCache::open(dir.path(), DEFAULT_TTL).await.unwrap();
        assert_eq!(
            reopened.get(&key).await.unwrap(),
            Some(Bytes::from_static(b"persisted"))
        );

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
