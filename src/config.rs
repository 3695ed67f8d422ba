//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::{CacheParameters, PolicyKind};
use crate::error::Result;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Numeric cache settings keep the declarative sentinels: zero or negative
/// capacity and TTL mean unbounded, a negative invalidation interval means never.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Name of the cache created at startup
    pub default_cache_name: String,
    /// Eviction policy of the default cache
    pub default_policy: PolicyKind,
    /// Capacity of the default cache
    pub default_capacity: i64,
    /// TTL of the default cache in milliseconds
    pub default_ttl_ms: i64,
    /// Invalidation interval of the default cache in milliseconds
    pub invalidation_interval_ms: i64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_CACHE_NAME` - Cache created at startup (default: "default")
    /// - `DEFAULT_POLICY` - fifo, lru or lfu (default: lru)
    /// - `DEFAULT_CAPACITY` - Maximum keys (default: 1000)
    /// - `DEFAULT_TTL_MS` - Entry lifetime in milliseconds (default: 300000)
    /// - `INVALIDATION_INTERVAL_MS` - Full invalidation period (default: -1, never)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            default_cache_name: env::var("DEFAULT_CACHE_NAME")
                .ok()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.default_cache_name),
            default_policy: parse_var("DEFAULT_POLICY").unwrap_or(defaults.default_policy),
            default_capacity: parse_var("DEFAULT_CAPACITY").unwrap_or(defaults.default_capacity),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            invalidation_interval_ms: parse_var("INVALIDATION_INTERVAL_MS")
                .unwrap_or(defaults.invalidation_interval_ms),
        }
    }

    /// Parameters of the cache created at startup.
    pub fn default_cache_parameters(&self) -> Result<CacheParameters> {
        CacheParameters::builder()
            .policy(self.default_policy)
            .capacity(self.default_capacity)
            .time_to_live_ms(self.default_ttl_ms)
            .invalidation_interval_ms(self.invalidation_interval_ms)
            .build()
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_cache_name: "default".to_string(),
            default_policy: PolicyKind::Lru,
            default_capacity: 1000,
            default_ttl_ms: 300_000,
            invalidation_interval_ms: -1,
        }
    }
}
