//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

use crate::backend::BackendKind;
use crate::cache::DEFAULT_PAGE_SIZE;
use crate::error::Result;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend connection string; its scheme selects the backend
    pub connection_string: String,
    /// Maximum number of pooled backend connections
    pub max_pool_size: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between expiry sweeps of the in-memory backend
    pub sweep_interval: u64,
    /// Default keys examined per scan round trip for key listings
    pub scan_page_size: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CONNECTION_STRING` - Backend connection string (default: memory://)
    /// - `CACHE_MAX_POOL_SIZE` - Pooled connections, at least 1 (default: 16)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    /// - `SCAN_PAGE_SIZE` - Keys per scan round trip (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_string: env::var("CACHE_CONNECTION_STRING")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.connection_string),
            max_pool_size: env::var("CACHE_MAX_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size| *size > 0)
                .unwrap_or(defaults.max_pool_size),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
            scan_page_size: env::var("SCAN_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size| *size > 0)
                .unwrap_or(defaults.scan_page_size),
        }
    }

    /// Backend named by the connection string.
    pub fn backend_kind(&self) -> Result<BackendKind> {
        BackendKind::from_connection_string(&self.connection_string)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: "memory://".to_string(),
            max_pool_size: 16,
            server_port: 3000,
            sweep_interval: 1,
            scan_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.connection_string, "memory://");
        assert_eq!(config.max_pool_size, 16);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval, 1);
        assert_eq!(config.scan_page_size, 1000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_CONNECTION_STRING");
        env::remove_var("CACHE_MAX_POOL_SIZE");
        env::remove_var("SERVER_PORT");
        env::remove_var("SWEEP_INTERVAL");
        env::remove_var("SCAN_PAGE_SIZE");

        let config = Config::from_env();
        assert_eq!(config.connection_string, "memory://");
        assert_eq!(config.max_pool_size, 16);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval, 1);
        assert_eq!(config.scan_page_size, 1000);
    }

    #[test]
    fn test_backend_kind_selection() {
        let config = Config::default();
        assert_eq!(config.backend_kind().unwrap(), BackendKind::Memory);

        let config = Config {
            connection_string: "redis://localhost:6379".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.backend_kind(),
            Err(CacheError::UnsupportedBackend(_))
        ));
    }
}
