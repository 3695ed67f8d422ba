//! Cache Module
//!
//! Eviction-policy stores (FIFO, LRU, LFU), the shared value pool, key and
//! identifier value types, and the registry routing stores by name.

mod entry;
mod fifo;
mod key;
mod lfu;
mod lru;
mod order;
mod params;
mod pool;
mod registry;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, EntryIds, StoredEntry};
pub use fifo::FifoStore;
pub use key::{CompoundKey, Identifier, KeyPart};
pub use lfu::LfuStore;
pub use lru::LruStore;
pub use order::OrderTracker;
pub use params::{
    CacheParameters, CacheParametersBuilder, PolicyKind, DEFAULT_EVICTION_STEP_PERCENTAGE,
    DEFAULT_PREEMPTIVE_EVICTION_PERCENTAGE,
};
pub use pool::{PooledValue, ValuePool};
pub use registry::{new_store, CacheRegistry};
pub use stats::{CacheStats, StatsRecorder};
pub use store::EvictionStore;
