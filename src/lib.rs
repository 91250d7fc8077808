//! distcache - A distributed cache with absolute and sliding expiration
//!
//! Layers two-tier expiration over any key-value store that offers a single
//! TTL per key, and serves it over HTTP.

pub mod api;
pub mod backend;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CachePolicy, DistributedCache};
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_sweeper_task;
