//! Value Codec Module
//!
//! Pluggable serialization for the typed `get_as` / `set_as` operations.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

/// Turns typed values into payload bytes and back.
pub trait ValueCodec: Send + Sync {
    /// Encodes `value`. A value that encodes to nothing must fail with
    /// `InvalidValue`.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

// == JSON Codec ==
/// Default codec: JSON via serde_json. `null` counts as an absent value.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let bytes = serde_json::to_vec(value)?;
        if bytes == b"null" {
            return Err(CacheError::InvalidValue("value must not be null".to_string()));
        }
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
