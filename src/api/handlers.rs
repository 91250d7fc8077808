//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use futures::TryStreamExt;

use crate::cache::DistributedCache;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, ExistsResponse, FindKeysQuery, GetResponse, HealthResponse, KeysResponse,
    RefreshResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// The cache is cheap to clone and keeps no state of its own, so no lock is
/// needed here.
#[derive(Clone)]
pub struct AppState {
    pub cache: DistributedCache,
    /// Default page size for key listings
    pub scan_page_size: usize,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: DistributedCache) -> Self {
        Self {
            cache,
            scan_page_size: crate::cache::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_scan_page_size(mut self, scan_page_size: usize) -> Self {
        self.scan_page_size = scan_page_size;
        self
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair under the requested expiration policy.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let (key, value, policy) = req.into_parts()?;
    state.cache.set(&key, value, &policy).await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key. Reading a sliding entry restarts its window.
/// Values that are not UTF-8 fail with a codec error rather than being
/// altered on the way out.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&key)
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    let value = String::from_utf8(value)
        .map_err(|e| CacheError::Codec(format!("value of '{}' is not UTF-8: {}", key, e)))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for POST /refresh/:key
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RefreshResponse>> {
    state.cache.refresh(&key).await?;
    Ok(Json(RefreshResponse::new(key)))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key. Deleting a missing key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.remove(&key).await?;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExistsResponse>> {
    let exists = state.cache.contains_key(&key).await?;
    Ok(Json(ExistsResponse::new(key, exists)))
}

/// Handler for GET /keys?pattern=..&page_size=..
///
/// Runs a complete scan and returns every matching key.
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<FindKeysQuery>,
) -> Result<Json<KeysResponse>> {
    let pattern = query.pattern()?;
    let page_size = query.page_size.unwrap_or(state.scan_page_size);

    let keys: Vec<String> = state
        .cache
        .find_keys(pattern, page_size)?
        .try_collect()
        .await?;

    Ok(Json(KeysResponse::new(pattern, keys)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.backend_name()))
}
