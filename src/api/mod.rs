//! API Module
//!
//! HTTP handlers and routing for the cache administration API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /caches` / `POST /caches` - List or create caches
//! - `GET /caches/:name/stats` - Cache statistics
//! - `POST /caches/:name/evict` - Run one eviction pass
//! - `DELETE /caches/:name` - Invalidate a cache
//! - `DELETE /caches/:name/keys` - Remove one key
//! - `GET /pool/stats` - Shared value pool size

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
