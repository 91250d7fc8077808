//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, exists_handler, get_handler, health_handler, keys_handler, refresh_handler,
    set_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a key-value pair under an expiration policy
/// - `GET /get/:key` - Retrieve a value by key
/// - `POST /refresh/:key` - Restart a sliding window without reading
/// - `DELETE /del/:key` - Delete a key
/// - `GET /exists/:key` - Physical existence check
/// - `GET /keys?pattern=` - List keys matching a Redis-style pattern
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/refresh/:key", post(refresh_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/exists/:key", get(exists_handler))
        .route("/keys", get(keys_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
