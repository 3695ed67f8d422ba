//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{
    CacheParameters, PolicyKind, DEFAULT_EVICTION_STEP_PERCENTAGE,
    DEFAULT_PREEMPTIVE_EVICTION_PERCENTAGE,
};
use crate::error::Result;

/// Longest accepted cache name
pub const MAX_CACHE_NAME_LENGTH: usize = 128;

/// Request body for creating a cache (POST /caches)
///
/// Numeric fields take the declarative sentinels: zero or negative capacity
/// and TTL mean unbounded, a negative invalidation interval means never.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCacheRequest {
    /// Name the cache is registered under
    pub name: String,
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default)]
    pub capacity: i64,
    #[serde(default)]
    pub time_to_live_ms: i64,
    #[serde(default = "default_invalidation_interval")]
    pub invalidation_interval_ms: i64,
    #[serde(default = "default_preemptive_percentage")]
    pub preemptive_eviction_percentage: i64,
    #[serde(default = "default_step_percentage")]
    pub eviction_step_percentage: i64,
    #[serde(default)]
    pub countdown_from_creation: bool,
    #[serde(default)]
    pub returns_collection: bool,
    #[serde(default)]
    pub handle_collection_keys_separately: bool,
}

fn default_invalidation_interval() -> i64 {
    -1
}

fn default_preemptive_percentage() -> i64 {
    DEFAULT_PREEMPTIVE_EVICTION_PERCENTAGE as i64
}

fn default_step_percentage() -> i64 {
    DEFAULT_EVICTION_STEP_PERCENTAGE as i64
}

impl CreateCacheRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("Cache name cannot be empty".to_string());
        }
        if self.name.len() > MAX_CACHE_NAME_LENGTH {
            return Some(format!(
                "Cache name exceeds maximum length of {} characters",
                MAX_CACHE_NAME_LENGTH
            ));
        }
        None
    }

    /// Normalizes the raw values into cache parameters.
    pub fn to_parameters(&self) -> Result<CacheParameters> {
        CacheParameters::builder()
            .policy(self.policy)
            .capacity(self.capacity)
            .time_to_live_ms(self.time_to_live_ms)
            .invalidation_interval_ms(self.invalidation_interval_ms)
            .preemptive_eviction_percentage(self.preemptive_eviction_percentage)
            .eviction_step_percentage(self.eviction_step_percentage)
            .countdown_from_creation(self.countdown_from_creation)
            .returns_collection(self.returns_collection)
            .handle_collection_keys_separately(self.handle_collection_keys_separately)
            .build()
    }
}

/// Request body for removing one key (DELETE /caches/:name/keys)
///
/// The key is the JSON array of its components, e.g. `[42, "eu"]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveKeyRequest {
    pub key: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_create_request_defaults() {
        let json = r#"{"name": "users"}"#;
        let req: CreateCacheRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.policy, PolicyKind::Lru);
        assert_eq!(req.invalidation_interval_ms, -1);

        let params = req.to_parameters().unwrap();
        assert_eq!(params, CacheParameters::default());
    }

    #[test]
    fn test_create_request_full() {
        let json = r#"{
            "name": "orders",
            "policy": "lfu",
            "capacity": 500,
            "time_to_live_ms": 60000,
            "eviction_step_percentage": 10,
            "returns_collection": true
        }"#;
        let req: CreateCacheRequest = serde_json::from_str(json).unwrap();
        let params = req.to_parameters().unwrap();
        assert_eq!(params.policy, PolicyKind::Lfu);
        assert_eq!(params.capacity, Some(500));
        assert_eq!(params.time_to_live, Some(Duration::from_secs(60)));
        assert_eq!(params.eviction_step(), 50);
        assert!(params.returns_collection);
    }

    #[test]
    fn test_contradictory_request_rejected() {
        let json = r#"{"name": "users", "handle_collection_keys_separately": true}"#;
        let req: CreateCacheRequest = serde_json::from_str(json).unwrap();
        assert!(req.to_parameters().is_err());
    }

    #[test]
    fn test_validate_name() {
        let json = r#"{"name": " "}"#;
        let req: CreateCacheRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_some());

        let req: CreateCacheRequest = serde_json::from_str(r#"{"name": "users"}"#).unwrap();
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_remove_key_request() {
        let req: RemoveKeyRequest = serde_json::from_str(r#"{"key": [42, "eu"]}"#).unwrap();
        assert_eq!(req.key.len(), 2);
    }
}
