//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheParameters, CacheStats, EvictionStore};

/// Summary of one cache (GET /caches, POST /caches)
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub name: String,
    /// Eviction algorithm name, e.g. "LRU"
    pub algorithm: String,
    /// Current number of keys
    pub entries: usize,
    pub parameters: CacheParameters,
}

impl CacheInfo {
    /// Describes a registered store.
    pub fn from_store(name: impl Into<String>, store: &dyn EvictionStore) -> Self {
        Self {
            name: name.into(),
            algorithm: store.algorithm_name().to_string(),
            entries: store.len(),
            parameters: store.parameters().clone(),
        }
    }
}

/// Response body for GET /caches
#[derive(Debug, Clone, Serialize)]
pub struct CacheListResponse {
    pub caches: Vec<CacheInfo>,
}

/// Response body for the stats endpoint (GET /caches/:name/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: String,
    pub algorithm: String,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Number of full invalidations
    pub invalidations: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Next eviction candidate, when one is known
    pub target_key: Option<Value>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(
        cache: impl Into<String>,
        algorithm: impl Into<String>,
        stats: &CacheStats,
        target_key: Option<Value>,
    ) -> Self {
        Self {
            cache: cache.into(),
            algorithm: algorithm.into(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            invalidations: stats.invalidations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            target_key,
        }
    }
}

/// Response body for POST /caches/:name/evict
#[derive(Debug, Clone, Serialize)]
pub struct EvictResponse {
    pub cache: String,
    /// Entries removed by the eviction pass
    pub removed: usize,
}

/// Response body for DELETE /caches/:name
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    pub cache: String,
    /// Entries dropped by the invalidation
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(cache: impl Into<String>, removed: usize) -> Self {
        let cache = cache.into();
        Self {
            message: format!("Cache '{}' invalidated", cache),
            cache,
            removed,
        }
    }
}

/// Response body for DELETE /caches/:name/keys
#[derive(Debug, Clone, Serialize)]
pub struct RemoveKeyResponse {
    pub cache: String,
    pub key: Value,
    /// Whether the key was present
    pub removed: bool,
}

/// Response body for GET /pool/stats
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatsResponse {
    /// Distinct domain objects currently pooled
    pub pooled_values: usize,
    /// Number of registered caches
    pub caches: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
