//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::cache::{CacheRegistry, CompoundKey, EvictionStore};
use crate::config::Config;
use crate::error::{MnemoError, Result};
use crate::models::{
    CacheInfo, CacheListResponse, CreateCacheRequest, EvictResponse, HealthResponse,
    InvalidateResponse, PoolStatsResponse, RemoveKeyRequest, RemoveKeyResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry of every named cache and the shared value pool
    pub registry: Arc<CacheRegistry>,
}

impl AppState {
    /// Creates a new AppState over an existing registry.
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        Self { registry }
    }

    /// Creates a registry holding the configured default cache.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(CacheRegistry::new());
        registry.create_cache(&config.default_cache_name, config.default_cache_parameters()?)?;
        Ok(Self::new(registry))
    }

    fn store(&self, name: &str) -> Result<Arc<dyn EvictionStore>> {
        self.registry
            .get(name)
            .ok_or_else(|| MnemoError::CacheNotFound(name.to_string()))
    }
}

/// Handler for GET /caches
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CacheListResponse> {
    let caches = state
        .registry
        .names()
        .into_iter()
        .filter_map(|name| {
            let store = state.registry.get(&name)?;
            Some(CacheInfo::from_store(name, store.as_ref()))
        })
        .collect();

    Json(CacheListResponse { caches })
}

/// Handler for POST /caches
///
/// Creating a name that already exists returns the existing cache.
pub async fn create_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateCacheRequest>,
) -> Result<(StatusCode, Json<CacheInfo>)> {
    if let Some(error_msg) = req.validate() {
        return Err(MnemoError::InvalidRequest(error_msg));
    }

    let existed = state.registry.contains(&req.name);
    let store = state.registry.create_cache(&req.name, req.to_parameters()?)?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(CacheInfo::from_store(req.name, store.as_ref()))))
}

/// Handler for GET /caches/:name/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatsResponse>> {
    let store = state.store(&name)?;
    let target = store.target_key().map(|key| key.to_value());

    Ok(Json(StatsResponse::new(
        name,
        store.algorithm_name(),
        &store.stats(),
        target,
    )))
}

/// Handler for POST /caches/:name/evict
///
/// Runs one eviction pass immediately.
pub async fn evict_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<EvictResponse>> {
    let store = state.store(&name)?;
    let removed = store.evict();

    Ok(Json(EvictResponse {
        cache: name,
        removed,
    }))
}

/// Handler for DELETE /caches/:name
///
/// Invalidates every entry; the cache itself stays registered.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let store = state.store(&name)?;
    let removed = store.len();
    store.invalidate();
    info!("Cache '{}' invalidated through the admin API", name);

    Ok(Json(InvalidateResponse::new(name, removed)))
}

/// Handler for DELETE /caches/:name/keys
pub async fn remove_key_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RemoveKeyRequest>,
) -> Result<Json<RemoveKeyResponse>> {
    let store = state.store(&name)?;
    let key = CompoundKey::from_values(&req.key);
    let removed = store.remove(&key);

    Ok(Json(RemoveKeyResponse {
        cache: name,
        key: key.to_value(),
        removed,
    }))
}

/// Handler for GET /pool/stats
pub async fn pool_stats_handler(State(state): State<AppState>) -> Json<PoolStatsResponse> {
    Json(PoolStatsResponse {
        pooled_values: state.registry.pool().size(),
        caches: state.registry.len(),
    })
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheParameters, EntryIds, Identifier};
    use serde_json::json;

    fn state_with_users() -> (AppState, Arc<dyn EvictionStore>) {
        let registry = Arc::new(CacheRegistry::new());
        let params = CacheParameters::builder().capacity(10).build().unwrap();
        let store = registry.create_cache("users", params).unwrap();
        (AppState::new(registry), store)
    }

    fn user_key(id: i64) -> CompoundKey {
        CompoundKey::from_values([&json!(id)])
    }

    #[tokio::test]
    async fn test_list_caches_handler() {
        let (state, _) = state_with_users();
        let response = list_caches_handler(State(state)).await;
        assert_eq!(response.caches.len(), 1);
        assert_eq!(response.caches[0].name, "users");
        assert_eq!(response.caches[0].algorithm, "LRU");
    }

    #[tokio::test]
    async fn test_create_cache_handler() {
        let (state, _) = state_with_users();
        let req: CreateCacheRequest =
            serde_json::from_value(json!({"name": "orders", "policy": "fifo", "capacity": 5}))
                .unwrap();

        let (status, info) = create_cache_handler(State(state.clone()), Json(req.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(info.algorithm, "FIFO");

        let (status, _) = create_cache_handler(State(state), Json(req)).await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_cache_invalid_request() {
        let (state, _) = state_with_users();
        let req: CreateCacheRequest = serde_json::from_value(json!({"name": ""})).unwrap();
        let result = create_cache_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(MnemoError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_stats_handler_reports_target() {
        let (state, store) = state_with_users();
        store.put(user_key(1), EntryIds::Single(Identifier::from(1)));
        store.get(&user_key(1));
        store.get(&user_key(2));

        let response = stats_handler(State(state), Path("users".to_string()))
            .await
            .unwrap();
        assert_eq!(response.hits, 1);
        assert_eq!(response.misses, 1);
        assert_eq!(response.total_entries, 1);
        assert_eq!(response.target_key, Some(json!([1])));
    }

    #[tokio::test]
    async fn test_unknown_cache_not_found() {
        let (state, _) = state_with_users();
        let result = stats_handler(State(state), Path("missing".to_string())).await;
        assert!(matches!(result, Err(MnemoError::CacheNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_key_and_invalidate() {
        let (state, store) = state_with_users();
        store.put(user_key(1), EntryIds::Single(Identifier::from(1)));
        store.put(user_key(2), EntryIds::Single(Identifier::from(2)));

        let req = RemoveKeyRequest { key: vec![json!(1)] };
        let response = remove_key_handler(State(state.clone()), Path("users".to_string()), Json(req))
            .await
            .unwrap();
        assert!(response.removed);
        assert_eq!(store.len(), 1);

        let response = invalidate_handler(State(state), Path("users".to_string()))
            .await
            .unwrap();
        assert_eq!(response.removed, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
