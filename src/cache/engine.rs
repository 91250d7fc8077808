//! Cache Engine Module
//!
//! Public cache operations. Combines the expiration calculator and the entry
//! codec against a [`Backend`]. The engine keeps no per-entry state: the
//! persisted record is the only source of truth.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{Backend, KeyPattern};
use crate::cache::codec::{JsonCodec, ValueCodec};
use crate::cache::entry::{self, CacheEntry, EntryMetadata};
use crate::cache::{expiration, CachePolicy, DEFAULT_PAGE_SIZE};
use crate::clock::{SharedClock, SystemClock};
use crate::error::{CacheError, Result};

/// Lazily scanned keys. Each item is one key or the backend error that
/// ended the scan.
pub type KeyStream = BoxStream<'static, Result<String>>;

// == Distributed Cache ==
/// Cache with absolute and sliding expiration over a TTL key-value store.
///
/// Cloning is cheap and clones share the backend.
///
/// Concurrent reads of the same sliding entry are not serialized: the
/// metadata rewrite on read is last-writer-wins.
#[derive(Clone)]
pub struct DistributedCache<V = JsonCodec> {
    backend: Arc<dyn Backend>,
    clock: SharedClock,
    codec: V,
}

impl DistributedCache<JsonCodec> {
    // == Constructor ==
    /// Creates a cache over `backend` using the system clock and JSON for
    /// typed values.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Arc<dyn Backend>, clock: SharedClock) -> Self {
        Self {
            backend,
            clock,
            codec: JsonCodec,
        }
    }
}

impl<V: ValueCodec> DistributedCache<V> {
    /// Swaps the codec used by typed operations.
    pub fn with_codec<W: ValueCodec>(self, codec: W) -> DistributedCache<W> {
        DistributedCache {
            backend: self.backend,
            clock: self.clock,
            codec,
        }
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // == Get ==
    /// Returns the value stored at `key`, or `None` if it is missing or its
    /// absolute expiration has passed.
    ///
    /// A hit records the access and, for sliding entries, restarts the
    /// physical TTL. An expired hit is deleted on a best-effort basis.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;

        let now = self.clock.now();
        let Some(record) = self.backend.get(key).await? else {
            debug!("Cache miss for key '{}'", key);
            return Ok(None);
        };

        let entry = entry::decode(record, now)?;
        if expiration::is_expired(now, entry.metadata.absolute_expiration) {
            debug!("Key '{}' observed expired on read", key);
            self.delete_expired(key).await;
            return Ok(None);
        }

        self.touch(key, entry.metadata, now).await?;
        Ok(Some(entry.value))
    }

    /// [`get`](Self::get) that refuses to start once `token` is cancelled.
    pub async fn get_with_cancel(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Result<Option<Vec<u8>>> {
        check_cancelled(token)?;
        self.get(key).await
    }

    /// Typed [`get`](Self::get), decoding the payload with the cache codec.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .await?
            .map(|bytes| self.codec.decode(&bytes))
            .transpose()
    }

    pub async fn get_as_with_cancel<T: DeserializeOwned>(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Result<Option<T>> {
        check_cancelled(token)?;
        self.get_as(key).await
    }

    // == Set ==
    /// Stores `value` at `key` under `policy`, replacing any previous entry.
    ///
    /// Fails with `InvalidExpiration` if the policy resolves to an instant
    /// that is not in the future. Nothing is written on invalid input.
    pub async fn set(&self, key: &str, value: Vec<u8>, policy: &CachePolicy) -> Result<()> {
        validate_key(key)?;

        let creation_time = self.clock.now();
        let absolute = expiration::resolve_absolute(creation_time, policy)?;
        expiration::validate_sliding(policy)?;

        let entry = CacheEntry::new(value, absolute, policy.sliding_expiration, creation_time);
        let ttl = expiration::physical_ttl(creation_time, absolute, policy.sliding_expiration);
        let record = entry::encode(&entry)?;

        self.backend.set(key, record, ttl).await?;
        debug!("Stored key '{}' with physical ttl {:?}", key, ttl);
        Ok(())
    }

    pub async fn set_with_cancel(
        &self,
        key: &str,
        value: Vec<u8>,
        policy: &CachePolicy,
        token: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(token)?;
        self.set(key, value, policy).await
    }

    /// Typed [`set`](Self::set), encoding `value` with the cache codec.
    pub async fn set_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        policy: &CachePolicy,
    ) -> Result<()> {
        validate_key(key)?;
        let bytes = self.codec.encode(value)?;
        self.set(key, bytes, policy).await
    }

    pub async fn set_as_with_cancel<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        policy: &CachePolicy,
        token: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(token)?;
        self.set_as(key, value, policy).await
    }

    // == Refresh ==
    /// Restarts the sliding window of `key` without reading its value.
    ///
    /// No-op for missing keys and for entries without a sliding expiration.
    pub async fn refresh(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let now = self.clock.now();
        let Some(raw) = self.backend.get_metadata(key).await? else {
            return Ok(());
        };

        let metadata = entry::decode_metadata(Some(&raw), now)?;
        if !metadata.is_sliding() {
            return Ok(());
        }
        if expiration::is_expired(now, metadata.absolute_expiration) {
            debug!("Key '{}' observed expired on refresh", key);
            self.delete_expired(key).await;
            return Ok(());
        }

        self.touch(key, metadata, now).await
    }

    pub async fn refresh_with_cancel(&self, key: &str, token: &CancellationToken) -> Result<()> {
        check_cancelled(token)?;
        self.refresh(key).await
    }

    // == Remove ==
    /// Deletes `key`. No-op if it does not exist.
    pub async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        if self.backend.delete(key).await? {
            debug!("Removed key '{}'", key);
        }
        Ok(())
    }

    pub async fn remove_with_cancel(&self, key: &str, token: &CancellationToken) -> Result<()> {
        check_cancelled(token)?;
        self.remove(key).await
    }

    // == Contains Key ==
    /// Physical existence check.
    ///
    /// Does not evaluate absolute expiration: a key past its absolute
    /// expiration that the backend has not evicted yet, and that no read has
    /// touched, still reports `true`. The empty key is a valid query.
    pub async fn contains_key(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    // == Find Keys ==
    /// Lazily scans keys matching the Redis-style `pattern`, `page_size` keys
    /// per backend round trip. See [`KeyPattern`] for the syntax.
    ///
    /// Every call starts a new scan. Order is backend-defined. A page size of
    /// zero is treated as one.
    pub fn find_keys(&self, pattern: &str, page_size: usize) -> Result<KeyStream> {
        KeyPattern::new(pattern)?;

        let scan = KeyScan {
            backend: Arc::clone(&self.backend),
            pattern: pattern.to_string(),
            page_size: page_size.max(1),
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        Ok(stream::try_unfold(scan, KeyScan::next_key).boxed())
    }

    /// [`find_keys`](Self::find_keys) with the default page size of 1000.
    pub fn find_keys_default(&self, pattern: &str) -> Result<KeyStream> {
        self.find_keys(pattern, DEFAULT_PAGE_SIZE)
    }

    // == Internal ==
    /// Records an access and moves the physical TTL of sliding entries.
    async fn touch(&self, key: &str, mut metadata: EntryMetadata, now: DateTime<Utc>) -> Result<()> {
        metadata.last_accessed = now;
        let ttl = expiration::refresh_ttl(
            now,
            metadata.absolute_expiration,
            metadata.sliding_expiration,
        );

        if !self
            .backend
            .set_metadata(key, entry::encode_metadata(&metadata)?)
            .await?
        {
            // Removed between the read and the rewrite.
            return Ok(());
        }

        if let Some(ttl) = ttl {
            self.backend.expire_in(key, ttl).await?;
            debug!("Refreshed key '{}' to physical ttl {:?}", key, ttl);
        }
        Ok(())
    }

    /// Lazy expiry. Failures are logged and swallowed: the caller already
    /// has its answer.
    async fn delete_expired(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!("Failed to delete expired key '{}': {}", key, e);
        }
    }
}

// == Key Scan ==
/// State of one `find_keys` scan.
struct KeyScan {
    backend: Arc<dyn Backend>,
    pattern: String,
    page_size: usize,
    cursor: Option<String>,
    buffer: VecDeque<String>,
    exhausted: bool,
}

impl KeyScan {
    async fn next_key(mut self) -> Result<Option<(String, Self)>> {
        loop {
            if let Some(key) = self.buffer.pop_front() {
                return Ok(Some((key, self)));
            }
            if self.exhausted {
                return Ok(None);
            }

            let page = self
                .backend
                .scan(&self.pattern, self.cursor.as_deref(), self.page_size)
                .await?;
            self.exhausted = page.cursor.is_none();
            self.cursor = page.cursor;
            self.buffer.extend(page.keys);
        }
    }
}

// == Validation ==
fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    Ok(())
}

fn check_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(CacheError::Cancelled);
    }
    Ok(())
}
