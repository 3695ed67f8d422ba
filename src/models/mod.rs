//! Request and Response models for the admin API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{CreateCacheRequest, RemoveKeyRequest};
pub use responses::{
    CacheInfo, CacheListResponse, ErrorResponse, EvictResponse, HealthResponse,
    InvalidateResponse, PoolStatsResponse, RemoveKeyResponse, StatsResponse,
};
