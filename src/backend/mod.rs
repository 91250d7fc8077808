//! Backend Module
//!
//! The minimal key-value capability the cache engine needs from a store, and
//! the shipped implementations of it.
//!
//! # Backends
//! - `memory://` - [`MemoryBackend`], an in-process store with TTLs

mod memory;
mod pattern;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

pub use memory::MemoryBackend;
pub use pattern::KeyPattern;

// == Record ==
/// What a backend stores under one key: a payload field and an optional
/// metadata field that can be rewritten on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: Vec<u8>,
    /// `None` for records written without expiration metadata
    pub meta: Option<Vec<u8>>,
}

// == Scan Page ==
/// One page of a key scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Matching keys examined in this page, possibly none
    pub keys: Vec<String>,
    /// Cursor for the next page, `None` once the scan is complete
    pub cursor: Option<String>,
}

// == Backend Trait ==
/// Key-value store operations used by the cache engine.
///
/// Every call is one round trip. Implementations hold a pooled connection
/// for the duration of the call only, and report connection failures as
/// `BackendUnavailable`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Record>>;

    /// Reads only the metadata field. `None` when the key is missing or the
    /// record has no metadata.
    async fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replaces the record. `Some(ttl)` sets the physical TTL, `None` leaves
    /// the key without one.
    async fn set(&self, key: &str, record: Record, ttl: Option<Duration>) -> Result<()>;

    /// Rewrites the metadata field of an existing key, keeping its payload
    /// and TTL. Returns false if the key does not exist.
    async fn set_metadata(&self, key: &str, meta: Vec<u8>) -> Result<bool>;

    /// Returns true if a key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Sets the physical TTL of an existing key. A zero TTL removes it.
    /// Returns false if the key does not exist.
    async fn expire_in(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Scans keys matching a Redis-style `pattern` (see [`KeyPattern`]),
    /// examining at most `count` keys.
    /// Pass `None` as cursor to start a scan.
    async fn scan(&self, pattern: &str, cursor: Option<&str>, count: usize) -> Result<ScanPage> {
        let _ = (pattern, cursor, count);
        Err(CacheError::UnsupportedBackend(format!(
            "{} backend cannot scan keys",
            self.name()
        )))
    }
}

// == Backend Kind ==
/// Backend technology named by a connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
}

impl BackendKind {
    /// Picks the backend from the connection string scheme.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let scheme = connection_string
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or(connection_string);

        match scheme.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(BackendKind::Memory),
            other => Err(CacheError::UnsupportedBackend(format!(
                "no backend for scheme '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GetOnly;

    #[async_trait]
    impl Backend for GetOnly {
        fn name(&self) -> &'static str {
            "get-only"
        }
        async fn get(&self, _key: &str) -> Result<Option<Record>> {
            Ok(None)
        }
        async fn get_metadata(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _record: Record, _ttl: Option<Duration>) -> Result<()> {
            Ok(())
        }
        async fn set_metadata(&self, _key: &str, _meta: Vec<u8>) -> Result<bool> {
            Ok(false)
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        async fn expire_in(&self, _key: &str, _ttl: Duration) -> Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_default_scan_is_unsupported() {
        let result = GetOnly.scan("*", None, 10).await;
        assert!(matches!(result, Err(CacheError::UnsupportedBackend(_))));
    }

    #[test]
    fn test_backend_kind_from_connection_string() {
        assert_eq!(
            BackendKind::from_connection_string("memory://").unwrap(),
            BackendKind::Memory
        );
        assert_eq!(
            BackendKind::from_connection_string("MEMORY://local").unwrap(),
            BackendKind::Memory
        );
        assert!(matches!(
            BackendKind::from_connection_string("redis://localhost:6379"),
            Err(CacheError::UnsupportedBackend(_))
        ));
    }
}
