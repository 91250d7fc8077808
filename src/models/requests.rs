//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::cache::CachePolicy;
use crate::error::{CacheError, Result};

/// Expiration options as sent over HTTP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyRequest {
    /// RFC 3339 instant
    #[serde(default)]
    pub absolute_expiration_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub absolute_expiration_after_secs: Option<u64>,
    #[serde(default)]
    pub sliding_expiration_secs: Option<u64>,
}

impl From<PolicyRequest> for CachePolicy {
    fn from(req: PolicyRequest) -> Self {
        CachePolicy {
            absolute_expiration_at: req.absolute_expiration_at,
            absolute_expiration_after: req.absolute_expiration_after_secs.map(Duration::from_secs),
            sliding_expiration: req.sliding_expiration_secs.map(Duration::from_secs),
        }
    }
}

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `policy`: Expiration options; send `{}` for an entry that never expires
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    #[serde(default)]
    pub value: Option<String>,
    /// Expiration options
    #[serde(default)]
    pub policy: Option<PolicyRequest>,
}

impl SetRequest {
    /// Validates the request and splits it into engine arguments.
    pub fn into_parts(self) -> Result<(String, Vec<u8>, CachePolicy)> {
        if self.key.trim().is_empty() {
            return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
        }
        let value = self
            .value
            .ok_or_else(|| CacheError::InvalidValue("value is required".to_string()))?;
        let policy = self
            .policy
            .ok_or_else(|| CacheError::InvalidPolicy("policy is required".to_string()))?;

        Ok((self.key, value.into_bytes(), policy.into()))
    }
}

/// Query string for the key listing (GET /keys)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindKeysQuery {
    /// Glob pattern, e.g. `user:*`
    #[serde(default)]
    pub pattern: Option<String>,
    /// Keys examined per backend round trip
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl FindKeysQuery {
    pub fn pattern(&self) -> Result<&str> {
        self.pattern
            .as_deref()
            .ok_or_else(|| CacheError::InvalidPattern("pattern is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": "hello", "policy": {}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        let (key, value, policy) = req.into_parts().unwrap();
        assert_eq!(key, "test");
        assert_eq!(value, b"hello");
        assert!(policy.is_unbounded());
    }

    #[test]
    fn test_set_request_with_policy() {
        let json = r#"{"key": "test", "value": "hello", "policy": {
            "absolute_expiration_at": "2030-01-01T00:00:00Z",
            "absolute_expiration_after_secs": 60,
            "sliding_expiration_secs": 10
        }}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        let (_, _, policy) = req.into_parts().unwrap();
        assert_eq!(
            policy.absolute_expiration_at.unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
        assert_eq!(policy.absolute_expiration_after, Some(Duration::from_secs(60)));
        assert_eq!(policy.sliding_expiration, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: Some("test".to_string()),
            policy: Some(PolicyRequest::default()),
        };
        assert!(matches!(req.into_parts(), Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn test_validate_missing_value() {
        let req: SetRequest = serde_json::from_str(r#"{"key": "k", "policy": {}}"#).unwrap();
        assert!(matches!(req.into_parts(), Err(CacheError::InvalidValue(_))));
    }

    #[test]
    fn test_validate_missing_policy() {
        let req: SetRequest = serde_json::from_str(r#"{"key": "k", "value": "v"}"#).unwrap();
        assert!(matches!(req.into_parts(), Err(CacheError::InvalidPolicy(_))));
    }

    #[test]
    fn test_find_keys_query_requires_pattern() {
        let query = FindKeysQuery::default();
        assert!(matches!(query.pattern(), Err(CacheError::InvalidPattern(_))));

        let query = FindKeysQuery {
            pattern: Some("user:*".to_string()),
            page_size: None,
        };
        assert_eq!(query.pattern().unwrap(), "user:*");
    }
}
