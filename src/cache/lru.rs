//! LRU Store Module
//!
//! Evicts the least recently used keys in steps of a configurable share of
//! capacity, then sweeps every expired entry regardless of position.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::store::{Lookup, StoreCore};
use crate::cache::{
    current_timestamp_ms, CacheParameters, CacheStats, CompoundKey, EntryIds, EvictionStore,
    Identifier, OrderTracker, ValuePool,
};

// == LRU Store ==
/// Least-recently-used store.
///
/// The recency queue keeps the head as the next victim. A hit moves its key
/// to the tail; a miss leaves the queue untouched. The queue lock covers
/// only queue updates, never map writes.
#[derive(Debug)]
pub struct LruStore {
    core: StoreCore,
    recency: Mutex<OrderTracker>,
}

impl LruStore {
    // == Constructor ==
    pub fn new(params: CacheParameters, pool: Arc<ValuePool>) -> Self {
        Self {
            core: StoreCore::new(params, pool),
            recency: Mutex::new(OrderTracker::new()),
        }
    }

    // == Evict Pass ==
    /// One eviction pass.
    ///
    /// At capacity, polls `eviction_step()` keys from the head, then keeps
    /// polling while concurrent writers have left the store over capacity.
    /// Every expired entry is removed afterwards.
    fn evict_pass(&self) -> usize {
        let mut removed = 0;

        if let Some(capacity) = self.core.params.capacity {
            if self.core.len() >= capacity {
                let victims: Vec<CompoundKey> = {
                    let mut recency = self.recency.lock();
                    (0..self.core.params.eviction_step())
                        .map_while(|_| recency.pop_oldest())
                        .collect()
                };
                for victim in victims {
                    if self.core.evict_tracked(&victim, self.algorithm_name()) {
                        removed += 1;
                    }
                }
                while self.core.len() > capacity {
                    let Some(oldest) = self.recency.lock().pop_oldest() else {
                        break;
                    };
                    if self.core.evict_tracked(&oldest, self.algorithm_name()) {
                        removed += 1;
                    }
                }
            }
        }

        for key in self.core.expired_keys(current_timestamp_ms()) {
            if self.core.take(&key).is_some() {
                self.recency.lock().remove(&key);
                removed += 1;
            }
        }

        self.core.stats.record_evictions(removed);
        removed
    }

    /// Runs an eviction pass when a new key would exceed capacity.
    fn make_room(&self, key: &CompoundKey) {
        if !self.core.entries.contains_key(key) && self.core.params.is_at_capacity(self.core.len())
        {
            self.evict_pass();
        }
    }
}

impl EvictionStore for LruStore {
    fn put(&self, key: CompoundKey, ids: EntryIds) {
        self.make_room(&key);
        self.core.insert(key.clone(), ids);
        self.recency.lock().touch(&key);
    }

    fn get(&self, key: &CompoundKey) -> Option<EntryIds> {
        match self.core.lookup(key) {
            Lookup::Hit(ids) => {
                self.recency.lock().refresh(key);
                Some(ids)
            }
            Lookup::Expired => {
                if self.core.take(key).is_some() {
                    self.core.stats.record_evictions(1);
                }
                self.recency.lock().remove(key);
                None
            }
            Lookup::Miss => None,
        }
    }

    fn merge(&self, key: &CompoundKey, ids: Vec<Identifier>) {
        self.make_room(key);
        self.core.merge(key, ids);
        self.recency.lock().touch(key);
    }

    fn merge_into_all(&self, id: &Identifier) {
        self.core.merge_into_all(id);
    }

    fn remove(&self, key: &CompoundKey) -> bool {
        self.recency.lock().remove(key);
        self.core.take(key).is_some()
    }

    fn remove_identifier_from_collection(&self, key: Option<&CompoundKey>, id: &Identifier) {
        self.core.remove_identifier(key, id);
    }

    fn evict(&self) -> usize {
        let removed = self.evict_pass();
        if removed > 0 {
            debug!("LRU eviction removed {} entries", removed);
        }
        removed
    }

    fn invalidate(&self) {
        let mut recency = self.recency.lock();
        let removed = self.core.clear();
        recency.clear();
        self.core.stats.record_invalidation();
        debug!("LRU invalidation removed {} entries", removed);
    }

    fn target_key(&self) -> Option<CompoundKey> {
        self.recency.lock().peek_oldest().cloned()
    }

    fn algorithm_name(&self) -> &'static str {
        "LRU"
    }

    fn contains(&self, key: &CompoundKey) -> bool {
        self.core.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.core.len()
    }

    fn stats(&self) -> CacheStats {
        self.core.snapshot()
    }

    fn parameters(&self) -> &CacheParameters {
        &self.core.params
    }
}
