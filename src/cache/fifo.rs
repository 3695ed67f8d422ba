//! FIFO Store Module
//!
//! Evicts keys in insertion order. Reads never reorder the queue.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::store::{Lookup, StoreCore};
use crate::cache::{
    current_timestamp_ms, CacheParameters, CacheStats, CompoundKey, EntryIds, EvictionStore,
    Identifier, OrderTracker, ValuePool,
};

// == FIFO Store ==
/// First-in, first-out store.
///
/// Map writes go straight to the concurrent map; the queue lock is held
/// only for the queue update itself. Capacity is therefore a soft bound
/// under concurrent writers, and `evict` trims any overshoot.
#[derive(Debug)]
pub struct FifoStore {
    core: StoreCore,
    queue: Mutex<OrderTracker>,
}

impl FifoStore {
    // == Constructor ==
    pub fn new(params: CacheParameters, pool: Arc<ValuePool>) -> Self {
        Self {
            core: StoreCore::new(params, pool),
            queue: Mutex::new(OrderTracker::new()),
        }
    }

    // == Drain Head ==
    /// Evicts from the head while the store holds more than `limit` keys.
    fn drain_head(&self, limit: usize) -> usize {
        let mut evicted = 0;
        while self.core.len() > limit {
            let Some(oldest) = self.queue.lock().pop_oldest() else {
                break;
            };
            if self.core.evict_tracked(&oldest, self.algorithm_name()) {
                evicted += 1;
            }
        }
        evicted
    }

    // == Make Room ==
    /// Drains the head while the store is at capacity, before a new key.
    fn make_room(&self, key: &CompoundKey) {
        let Some(capacity) = self.core.params.capacity else {
            return;
        };
        if self.core.entries.contains_key(key) {
            return;
        }
        let evicted = self.drain_head(capacity.saturating_sub(1));
        self.core.stats.record_evictions(evicted);
    }

    /// Removes an entry found expired on read.
    fn discard(&self, key: &CompoundKey) {
        if self.core.take(key).is_some() {
            self.core.stats.record_evictions(1);
        }
        self.queue.lock().remove(key);
    }
}

impl EvictionStore for FifoStore {
    fn put(&self, key: CompoundKey, ids: EntryIds) {
        self.make_room(&key);
        self.core.insert(key.clone(), ids);
        self.queue.lock().append(&key);
    }

    fn get(&self, key: &CompoundKey) -> Option<EntryIds> {
        match self.core.lookup(key) {
            Lookup::Hit(ids) => Some(ids),
            Lookup::Expired => {
                self.discard(key);
                None
            }
            Lookup::Miss => None,
        }
    }

    fn merge(&self, key: &CompoundKey, ids: Vec<Identifier>) {
        self.make_room(key);
        if self.core.merge(key, ids) {
            self.queue.lock().append(key);
        }
    }

    fn merge_into_all(&self, id: &Identifier) {
        self.core.merge_into_all(id);
    }

    fn remove(&self, key: &CompoundKey) -> bool {
        self.queue.lock().remove(key);
        self.core.take(key).is_some()
    }

    fn remove_identifier_from_collection(&self, key: Option<&CompoundKey>, id: &Identifier) {
        self.core.remove_identifier(key, id);
    }

    fn evict(&self) -> usize {
        let mut removed = match self.core.params.capacity {
            Some(capacity) => self.drain_head(capacity),
            None => 0,
        };

        for key in self.core.expired_keys(current_timestamp_ms()) {
            if self.core.take(&key).is_some() {
                self.queue.lock().remove(&key);
                removed += 1;
            }
        }

        self.core.stats.record_evictions(removed);
        if removed > 0 {
            debug!("FIFO eviction removed {} entries", removed);
        }
        removed
    }

    fn invalidate(&self) {
        let mut queue = self.queue.lock();
        let removed = self.core.clear();
        queue.clear();
        self.core.stats.record_invalidation();
        debug!("FIFO invalidation removed {} entries", removed);
    }

    fn target_key(&self) -> Option<CompoundKey> {
        self.queue.lock().peek_oldest().cloned()
    }

    fn algorithm_name(&self) -> &'static str {
        "FIFO"
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

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: i64) -> CompoundKey {
        CompoundKey::new(vec![n.into()])
    }

    fn single(n: i64) -> EntryIds {
        EntryIds::Single(Identifier::from(n))
    }

    fn store(capacity: i64) -> FifoStore {
        let params = CacheParameters::builder().capacity(capacity).build().unwrap();
        FifoStore::new(params, Arc::new(ValuePool::new()))
    }

    #[test]
    fn test_put_evicts_head_at_capacity() {
        let store = store(3);
        for n in 1..=4 {
            store.put(key(n), single(n));
        }

        assert_eq!(store.len(), 3);
        assert!(store.get(&key(1)).is_none());
        assert_eq!(store.get(&key(4)), Some(single(4)));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_reads_do_not_reorder() {
        let store = store(3);
        for n in 1..=3 {
            store.put(key(n), single(n));
        }
        store.get(&key(1));
        store.put(key(4), single(4));

        assert!(!store.contains(&key(1)));
        assert!(store.contains(&key(2)));
        assert_eq!(store.target_key(), Some(key(2)));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let store = store(2);
        store.put(key(1), single(1));
        store.put(key(2), single(2));
        store.put(key(1), single(10));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&key(1)), Some(single(10)));
        assert_eq!(store.target_key(), Some(key(1)));
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let store = store(0);
        for n in 0..500 {
            store.put(key(n), single(n));
        }
        assert_eq!(store.evict(), 0);
        assert_eq!(store.len(), 500);
    }

    #[test]
    fn test_remove_and_invalidate() {
        let store = store(10);
        store.put(key(1), single(1));
        store.put(key(2), single(2));

        assert!(store.remove(&key(1)));
        assert!(!store.remove(&key(1)));
        assert_eq!(store.target_key(), Some(key(2)));

        store.invalidate();
        assert!(store.is_empty());
        assert!(store.target_key().is_none());
        store.invalidate();
        assert!(store.is_empty());
        assert_eq!(store.stats().invalidations, 2);
    }

    #[test]
    fn test_expired_entries_swept() {
        let params = CacheParameters::builder()
            .policy(crate::cache::PolicyKind::Fifo)
            .time_to_live_ms(30)
            .countdown_from_creation(true)
            .build()
            .unwrap();
        let store = FifoStore::new(params, Arc::new(ValuePool::new()));
        store.put(key(1), single(1));

        std::thread::sleep(std::time::Duration::from_millis(80));

        assert_eq!(store.evict(), 1);
        assert!(store.is_empty());
        assert!(store.target_key().is_none());
    }

    #[test]
    fn test_algorithm_name() {
        assert_eq!(store(1).algorithm_name(), "FIFO");
    }

    #[test]
    fn test_evict_trims_overshoot() {
        let store = store(5);
        // eight entries, as left by writers racing past a full store
        for n in 0..8 {
            store.core.insert(key(n), single(n));
            store.queue.lock().append(&key(n));
        }

        assert_eq!(store.evict(), 3);
        assert_eq!(store.len(), 5);
        assert!(!store.contains(&key(2)));
        assert!(store.contains(&key(3)));
    }
}
