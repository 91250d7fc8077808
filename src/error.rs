//! Error types for the distributed cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

// == Cache Error Enum ==
/// Unified error type for the cache engine, its backends and the HTTP facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Empty or missing key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Missing value on set
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Missing policy on set
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Resolved expiration is not strictly in the future
    #[error("Invalid expiration: {0}")]
    InvalidExpiration(String),

    /// Missing or malformed scan pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Connection or round-trip failure against the backend
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend does not provide the requested capability
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// Caller cancelled the operation before it started
    #[error("Operation cancelled")]
    Cancelled,

    /// Record or value could not be encoded/decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Key not found (HTTP facade only; the engine reports absence as `None`)
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Returns true for errors raised by input validation, before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidKey(_)
                | CacheError::InvalidValue(_)
                | CacheError::InvalidPolicy(_)
                | CacheError::InvalidExpiration(_)
                | CacheError::InvalidPattern(_)
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Codec(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        if self.is_validation() {
            debug!("Rejected request: {}", self);
        } else if !matches!(self, CacheError::NotFound(_)) {
            warn!("Request failed: {}", self);
        }

        let status = match &self {
            CacheError::InvalidKey(_)
            | CacheError::InvalidValue(_)
            | CacheError::InvalidPolicy(_)
            | CacheError::InvalidExpiration(_)
            | CacheError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            CacheError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::UnsupportedBackend(_) => StatusCode::NOT_IMPLEMENTED,
            CacheError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(CacheError::InvalidKey("k".to_string()).is_validation());
        assert!(CacheError::InvalidExpiration("e".to_string()).is_validation());
        assert!(!CacheError::BackendUnavailable("down".to_string()).is_validation());
        assert!(!CacheError::Cancelled.is_validation());
    }

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (CacheError::InvalidKey("k".to_string()), StatusCode::BAD_REQUEST),
            (CacheError::InvalidPolicy("p".to_string()), StatusCode::BAD_REQUEST),
            (CacheError::NotFound("key".to_string()), StatusCode::NOT_FOUND),
            (CacheError::Cancelled, StatusCode::REQUEST_TIMEOUT),
            (
                CacheError::BackendUnavailable("down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CacheError::UnsupportedBackend("redis".to_string()),
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                CacheError::Codec("bad".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.into_response().status(), expected_status);
        }
    }

    #[test]
    fn test_serde_error_maps_to_codec() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(CacheError::from(err), CacheError::Codec(_)));
    }
}
