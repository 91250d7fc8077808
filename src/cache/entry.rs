//! Cache Entry Module
//!
//! Defines the persisted form of a cache entry: the value plus the expiration
//! metadata needed to re-derive its physical TTL after a restart.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::Record;
use crate::error::Result;

// == Entry Metadata ==
/// Expiration metadata stored next to the value.
///
/// Fields are optional on the wire so that a record written before metadata
/// existed still decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Resolved at write time, immutable afterwards
    #[serde(default)]
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Immutable after write
    #[serde(default)]
    pub sliding_expiration: Option<Duration>,
    /// Updated on every successful read
    pub last_accessed: DateTime<Utc>,
}

impl EntryMetadata {
    /// Metadata for a record carrying no expiration information.
    pub fn unbounded(now: DateTime<Utc>) -> Self {
        Self {
            absolute_expiration: None,
            sliding_expiration: None,
            last_accessed: now,
        }
    }

    /// Returns true if reads move this entry's physical TTL.
    pub fn is_sliding(&self) -> bool {
        self.sliding_expiration.is_some()
    }
}

// == Cache Entry ==
/// A value together with its expiration metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Opaque payload
    pub value: Vec<u8>,
    pub metadata: EntryMetadata,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry written at `creation_time`.
    pub fn new(
        value: Vec<u8>,
        absolute_expiration: Option<DateTime<Utc>>,
        sliding_expiration: Option<Duration>,
        creation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            value,
            metadata: EntryMetadata {
                absolute_expiration,
                sliding_expiration,
                last_accessed: creation_time,
            },
        }
    }
}

// == Codec ==
/// Packs an entry into a backend record.
pub fn encode(entry: &CacheEntry) -> Result<Record> {
    Ok(Record {
        data: entry.value.clone(),
        meta: Some(encode_metadata(&entry.metadata)?),
    })
}

/// Unpacks a backend record. A record without metadata is treated as an
/// entry with no expiration, last accessed at `now`.
pub fn decode(record: Record, now: DateTime<Utc>) -> Result<CacheEntry> {
    let metadata = decode_metadata(record.meta.as_deref(), now)?;
    Ok(CacheEntry {
        value: record.data,
        metadata,
    })
}

/// Serializes metadata on its own, for updates that leave the value alone.
pub fn encode_metadata(metadata: &EntryMetadata) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(metadata)?)
}

pub fn decode_metadata(raw: Option<&[u8]>, now: DateTime<Utc>) -> Result<EntryMetadata> {
    match raw {
        Some(bytes) => Ok(serde_json::from_slice(bytes)?),
        None => Ok(EntryMetadata::unbounded(now)),
    }
}
