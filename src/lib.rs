//! Mnemo - A method-result caching engine
//!
//! Caches the results of computations under FIFO, LRU or LFU stores,
//! deduplicates domain objects across caches in a shared reference-counted
//! pool, and keeps related caches in step through declarative update rules.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod invocation;
pub mod models;
pub mod proxy;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheParameters, CacheRegistry, EvictionStore, PolicyKind, ValuePool};
pub use config::Config;
pub use error::{MnemoError, Result};
pub use invocation::{MethodDescriptor, MethodInvocationContext};
pub use proxy::CacheOrchestrator;
