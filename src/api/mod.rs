//! API Module
//!
//! HTTP handlers and routing exposing the distributed cache over REST.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair under an expiration policy
//! - `GET /get/:key` - Retrieve a value by key
//! - `POST /refresh/:key` - Restart a sliding window
//! - `DELETE /del/:key` - Delete a key
//! - `GET /exists/:key` - Existence check
//! - `GET /keys?pattern=` - List matching keys
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
