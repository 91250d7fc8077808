//! Memory Backend Module
//!
//! In-process key-value store with per-key TTLs, pattern scans and a bounded
//! connection pool.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, Semaphore, SemaphorePermit};
use tracing::debug;

use crate::backend::{Backend, KeyPattern, Record, ScanPage};
use crate::clock::{SharedClock, SystemClock};
use crate::error::{CacheError, Result};

// == Stored Record ==
/// A record plus its physical expiry.
#[derive(Debug, Clone)]
struct StoredRecord {
    record: Record,
    /// None = no expiration
    expires_at: Option<DateTime<Utc>>,
}

impl StoredRecord {
    /// Expired once `now` reaches the expiry instant.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Remaining TTL, zero once expired, None without expiry.
    fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|expires| (expires - now).to_std().unwrap_or(Duration::ZERO))
    }
}

// == Memory Backend ==
/// Ordered in-memory store.
///
/// Keys expire passively (an expired key reads as missing and is dropped on
/// access) and actively through [`MemoryBackend::purge_expired`], which the
/// sweeper task calls on an interval.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, StoredRecord>>,
    /// One permit per pooled connection
    pool: Semaphore,
    clock: SharedClock,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates an empty backend with `max_pool_size` connections and the
    /// system clock.
    pub fn new(max_pool_size: usize) -> Self {
        Self::with_clock(max_pool_size, Arc::new(SystemClock))
    }

    pub fn with_clock(max_pool_size: usize, clock: SharedClock) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            pool: Semaphore::new(max_pool_size.max(1)),
            clock,
        }
    }

    /// Closes the connection pool. Every later call fails with
    /// `BackendUnavailable`.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Number of pooled connections not currently in use.
    pub fn idle_connections(&self) -> usize {
        self.pool.available_permits()
    }

    async fn connect(&self) -> Result<SemaphorePermit<'_>> {
        self.pool
            .acquire()
            .await
            .map_err(|_| CacheError::BackendUnavailable("connection pool is closed".to_string()))
    }

    fn expiry_for(&self, now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Some(now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Drops `key` if it has expired. Returns the live record, if any.
    fn live<'a>(
        entries: &'a mut BTreeMap<String, StoredRecord>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut StoredRecord> {
        if entries.get(key).is_some_and(|stored| stored.is_expired(now)) {
            entries.remove(key);
            debug!("Passively expired key '{}'", key);
            return None;
        }
        entries.get_mut(key)
    }

    // == Inspection ==
    /// Remaining physical TTL of a live key. `None` if the key is missing or
    /// has no TTL.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|stored| !stored.is_expired(now))
            .and_then(|stored| stored.ttl_remaining(now))
    }

    /// Number of keys held, including expired keys not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    // == Purge Expired ==
    /// Removes all expired keys. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Record>> {
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        Ok(Self::live(&mut entries, key, now).map(|stored| stored.record.clone()))
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        Ok(Self::live(&mut entries, key, now).and_then(|stored| stored.record.meta.clone()))
    }

    async fn set(&self, key: &str, record: Record, ttl: Option<Duration>) -> Result<()> {
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let expires_at = ttl.and_then(|ttl| self.expiry_for(now, ttl));
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), StoredRecord { record, expires_at });
        Ok(())
    }

    async fn set_metadata(&self, key: &str, meta: Vec<u8>) -> Result<bool> {
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        match Self::live(&mut entries, key, now) {
            Some(stored) => {
                stored.record.meta = Some(meta);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .is_some_and(|stored| !stored.is_expired(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        Ok(Self::live(&mut entries, key, now).is_some())
    }

    async fn expire_in(&self, key: &str, ttl: Duration) -> Result<bool> {
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        if Self::live(&mut entries, key, now).is_none() {
            return Ok(false);
        }
        if ttl.is_zero() {
            entries.remove(key);
            return Ok(true);
        }
        let expires_at = self.expiry_for(now, ttl);
        if let Some(stored) = entries.get_mut(key) {
            stored.expires_at = expires_at;
        }
        Ok(true)
    }

    async fn scan(&self, pattern: &str, cursor: Option<&str>, count: usize) -> Result<ScanPage> {
        let matcher = KeyPattern::new(pattern)?;
        let _conn = self.connect().await?;
        let now = self.clock.now();
        let entries = self.entries.read().await;

        let start = match cursor {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        let examined: Vec<(&String, &StoredRecord)> = entries
            .range::<str, _>((start, Bound::Unbounded))
            .take(count.max(1))
            .collect();

        let next = if examined.len() < count.max(1) {
            None
        } else {
            examined.last().map(|(key, _)| (*key).clone())
        };
        let keys = examined
            .into_iter()
            .filter(|(key, stored)| !stored.is_expired(now) && matcher.matches(key))
            .map(|(key, _)| key.clone())
            .collect();

        Ok(ScanPage { keys, cursor: next })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn record(data: &str) -> Record {
        Record {
            data: data.as_bytes().to_vec(),
            meta: Some(b"{}".to_vec()),
        }
    }

    fn backend_with_clock() -> (MemoryBackend, ManualClock) {
        let clock = ManualClock::default();
        (MemoryBackend::with_clock(4, Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = MemoryBackend::new(4);
        backend.set("key1", record("value1"), None).await.unwrap();

        let stored = backend.get("key1").await.unwrap().unwrap();
        assert_eq!(stored.data, b"value1");
        assert!(backend.ttl("key1").await.is_none());
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MemoryBackend::new(4);
        assert!(backend.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let (backend, clock) = backend_with_clock();
        backend
            .set("key1", record("value1"), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(backend.exists("key1").await.unwrap());

        clock.advance(Duration::from_secs(1));

        assert!(!backend.exists("key1").await.unwrap());
        assert!(backend.get("key1").await.unwrap().is_none());
        assert_eq!(backend.len().await, 0, "expired key is dropped on access");
    }

    #[tokio::test]
    async fn test_set_without_ttl_clears_previous_ttl() {
        let backend = MemoryBackend::new(4);
        backend
            .set("key1", record("a"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        backend.set("key1", record("b"), None).await.unwrap();
        assert!(backend.ttl("key1").await.is_none());
    }

    #[tokio::test]
    async fn test_set_metadata_keeps_data_and_ttl() {
        let (backend, _clock) = backend_with_clock();
        backend
            .set("key1", record("payload"), Some(Duration::from_secs(30)))
            .await
            .unwrap();

        assert!(backend.set_metadata("key1", b"new".to_vec()).await.unwrap());

        let stored = backend.get("key1").await.unwrap().unwrap();
        assert_eq!(stored.data, b"payload");
        assert_eq!(stored.meta.as_deref(), Some(&b"new"[..]));
        assert_eq!(backend.ttl("key1").await, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_set_metadata_missing_key() {
        let backend = MemoryBackend::new(4);
        assert!(!backend.set_metadata("nope", b"{}".to_vec()).await.unwrap());
        assert!(!backend.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_metadata() {
        let backend = MemoryBackend::new(4);
        backend.set("key1", record("v"), None).await.unwrap();
        backend
            .set("legacy", Record { data: b"v".to_vec(), meta: None }, None)
            .await
            .unwrap();

        assert_eq!(backend.get_metadata("key1").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(backend.get_metadata("legacy").await.unwrap(), None);
        assert_eq!(backend.get_metadata("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MemoryBackend::new(4);
        backend.set("key1", record("v"), None).await.unwrap();

        assert!(backend.delete("key1").await.unwrap());
        assert!(!backend.delete("key1").await.unwrap());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_expire_in() {
        let (backend, clock) = backend_with_clock();
        backend.set("key1", record("v"), None).await.unwrap();

        assert!(backend.expire_in("key1", Duration::from_secs(10)).await.unwrap());
        assert_eq!(backend.ttl("key1").await, Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(4));
        assert_eq!(backend.ttl("key1").await, Some(Duration::from_secs(6)));

        assert!(!backend.expire_in("missing", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_in_zero_removes_key() {
        let backend = MemoryBackend::new(4);
        backend.set("key1", record("v"), None).await.unwrap();

        assert!(backend.expire_in("key1", Duration::ZERO).await.unwrap());
        assert!(!backend.exists("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (backend, clock) = backend_with_clock();
        backend
            .set("key1", record("v"), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        backend
            .set("key2", record("v"), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(2));

        assert_eq!(backend.purge_expired().await, 1);
        assert_eq!(backend.len().await, 1);
        assert!(backend.exists("key2").await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_pages_through_matches() {
        let backend = MemoryBackend::new(4);
        for key in ["user:1", "user:2", "order:1", "user:3", "session:9"] {
            backend.set(key, record("v"), None).await.unwrap();
        }

        let mut cursor: Option<String> = None;
        let mut found = Vec::new();
        let mut pages = 0;
        loop {
            let page = backend.scan("user:*", cursor.as_deref(), 2).await.unwrap();
            found.extend(page.keys);
            pages += 1;
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(found, vec!["user:1", "user:2", "user:3"]);
        assert!(pages >= 3);
    }

    #[tokio::test]
    async fn test_scan_skips_expired_keys() {
        let (backend, clock) = backend_with_clock();
        backend
            .set("a:1", record("v"), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        backend.set("a:2", record("v"), None).await.unwrap();
        clock.advance(Duration::from_secs(5));

        let page = backend.scan("a:*", None, 100).await.unwrap();
        assert_eq!(page.keys, vec!["a:2"]);
        assert!(page.cursor.is_none());
    }

    #[tokio::test]
    async fn test_scan_redis_pattern_syntax() {
        let backend = MemoryBackend::new(4);
        for key in ["user:1", "user:2", "user:^", "a*b", "axb"] {
            backend.set(key, record("v"), None).await.unwrap();
        }

        let page = backend.scan("user:**", None, 100).await.unwrap();
        assert_eq!(page.keys, vec!["user:1", "user:2", "user:^"]);

        let page = backend.scan("user:[^1]", None, 100).await.unwrap();
        assert_eq!(page.keys, vec!["user:2", "user:^"]);

        let page = backend.scan("a\\*b", None, 100).await.unwrap();
        assert_eq!(page.keys, vec!["a*b"]);

        // An unclosed class is not an error, it just matches nothing here
        let page = backend.scan("user:[", None, 100).await.unwrap();
        assert!(page.keys.is_empty());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let backend = MemoryBackend::new(4);
        backend.close();

        assert!(matches!(
            backend.get("key").await,
            Err(CacheError::BackendUnavailable(_))
        ));
        assert!(matches!(
            backend.set("key", record("v"), None).await,
            Err(CacheError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_connections_released_after_each_call() {
        let backend = MemoryBackend::new(2);
        backend.set("key1", record("v"), None).await.unwrap();
        backend.get("key1").await.unwrap();
        let _ = backend.scan("[", None, 10).await;

        assert_eq!(backend.idle_connections(), 2);
    }
}
