//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_cache_handler, evict_handler, health_handler, invalidate_handler, list_caches_handler,
    pool_stats_handler, remove_key_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /caches` - List caches
/// - `POST /caches` - Create a cache
/// - `GET /caches/:name/stats` - Statistics of one cache
/// - `POST /caches/:name/evict` - Run one eviction pass
/// - `DELETE /caches/:name` - Invalidate a cache
/// - `DELETE /caches/:name/keys` - Remove one key
/// - `GET /pool/stats` - Shared value pool size
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/caches", get(list_caches_handler).post(create_cache_handler))
        .route("/caches/:name", delete(invalidate_handler))
        .route("/caches/:name/stats", get(stats_handler))
        .route("/caches/:name/evict", post(evict_handler))
        .route("/caches/:name/keys", delete(remove_key_handler))
        .route("/pool/stats", get(pool_stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
