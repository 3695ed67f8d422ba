//! LFU Store Module
//!
//! Least-frequently-used eviction without a live frequency index. Ranking
//! the whole store on every access does not scale under concurrency, so the
//! store only ranks when it fills past the preemptive threshold, and keeps
//! the result as the list of keys to evict next.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::store::{Lookup, StoreCore};
use crate::cache::{
    current_timestamp_ms, CacheParameters, CacheStats, CompoundKey, EntryIds, EvictionStore,
    Identifier, ValuePool,
};

// == LFU Store ==
/// Least-frequently-used store with a lazily computed candidate list.
///
/// Candidates are a snapshot taken when the store crosses
/// `capacity * preemptive% / 100`; they are removed by the next eviction
/// and recomputed the next time the threshold is crossed.
#[derive(Debug)]
pub struct LfuStore {
    core: StoreCore,
    to_evict_next: Mutex<Vec<CompoundKey>>,
}

impl LfuStore {
    // == Constructor ==
    pub fn new(params: CacheParameters, pool: Arc<ValuePool>) -> Self {
        Self {
            core: StoreCore::new(params, pool),
            to_evict_next: Mutex::new(Vec::new()),
        }
    }

    // == Prepare Candidates ==
    /// Ranks the current entries into `candidates`.
    ///
    /// Every expired entry comes first. Then the `limit` least-frequently-used
    /// live entries, ties going to the oldest. The limit is one eviction
    /// step plus whatever the store currently holds beyond capacity.
    fn prepare_candidates(&self, candidates: &mut Vec<CompoundKey>) {
        let Some(capacity) = self.core.params.capacity else {
            return;
        };
        let size = self.core.len();
        let limit = self.core.params.eviction_step() + size.saturating_sub(capacity);
        let now = current_timestamp_ms();

        let mut expired = Vec::new();
        let mut live: Vec<(u64, u64, CompoundKey)> = Vec::with_capacity(size);
        for entry in self.core.entries.iter() {
            if entry.is_expired(&self.core.params, now) {
                expired.push(entry.key().clone());
            } else {
                live.push((entry.hits, entry.created_on, entry.key().clone()));
            }
        }
        live.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        candidates.clear();
        candidates.extend(expired);
        candidates.extend(live.into_iter().take(limit).map(|(_, _, key)| key));
        trace!(
            "LFU prepared {} eviction candidates at size {}",
            candidates.len(),
            size
        );
    }

    /// Computes candidates once the store has crossed the preemptive threshold.
    fn prepare_if_needed(&self) {
        let Some(threshold) = self.core.params.preemptive_threshold() else {
            return;
        };
        if self.core.len() >= threshold {
            let mut candidates = self.to_evict_next.lock();
            if candidates.is_empty() {
                self.prepare_candidates(&mut candidates);
            }
        }
    }

    /// Removes the current candidates and clears the list.
    fn drain_candidates(&self, candidates: &mut Vec<CompoundKey>) -> usize {
        candidates
            .drain(..)
            .filter(|key| self.core.take(key).is_some())
            .count()
    }

    // == Make Room ==
    /// Synchronous eviction for a write at capacity.
    ///
    /// A stale candidate list can remove nothing; in that case the store is
    /// ranked afresh and drained once more.
    fn make_room(&self) {
        let mut candidates = self.to_evict_next.lock();
        if candidates.is_empty() {
            self.prepare_candidates(&mut candidates);
        }
        let mut removed = self.drain_candidates(&mut candidates);
        if self.core.params.is_at_capacity(self.core.len()) {
            self.prepare_candidates(&mut candidates);
            removed += self.drain_candidates(&mut candidates);
        }
        self.core.stats.record_evictions(removed);
    }
}

impl EvictionStore for LfuStore {
    fn put(&self, key: CompoundKey, ids: EntryIds) {
        if !self.core.entries.contains_key(&key) && self.core.params.is_at_capacity(self.core.len())
        {
            self.make_room();
        }
        self.core.insert(key, ids);
        self.prepare_if_needed();
    }

    fn get(&self, key: &CompoundKey) -> Option<EntryIds> {
        match self.core.lookup(key) {
            Lookup::Hit(ids) => Some(ids),
            Lookup::Expired => {
                if self.core.take(key).is_some() {
                    self.core.stats.record_evictions(1);
                }
                None
            }
            Lookup::Miss => None,
        }
    }

    fn merge(&self, key: &CompoundKey, ids: Vec<Identifier>) {
        if !self.core.entries.contains_key(key) && self.core.params.is_at_capacity(self.core.len())
        {
            self.make_room();
        }
        self.core.merge(key, ids);
        self.prepare_if_needed();
    }

    fn merge_into_all(&self, id: &Identifier) {
        self.core.merge_into_all(id);
    }

    fn remove(&self, key: &CompoundKey) -> bool {
        self.core.take(key).is_some()
    }

    fn remove_identifier_from_collection(&self, key: Option<&CompoundKey>, id: &Identifier) {
        self.core.remove_identifier(key, id);
    }

    fn evict(&self) -> usize {
        let mut removed = {
            let mut candidates = self.to_evict_next.lock();
            let mut removed = self.drain_candidates(&mut candidates);
            // writers racing past a full store leave it over capacity
            if let Some(capacity) = self.core.params.capacity {
                if self.core.len() > capacity {
                    self.prepare_candidates(&mut candidates);
                    removed += self.drain_candidates(&mut candidates);
                }
            }
            removed
        };

        for key in self.core.expired_keys(current_timestamp_ms()) {
            if self.core.take(&key).is_some() {
                removed += 1;
            }
        }

        self.core.stats.record_evictions(removed);
        if removed > 0 {
            debug!("LFU eviction removed {} entries", removed);
        }
        removed
    }

    fn invalidate(&self) {
        let mut candidates = self.to_evict_next.lock();
        candidates.clear();
        let removed = self.core.clear();
        self.core.stats.record_invalidation();
        debug!("LFU invalidation removed {} entries", removed);
    }

    /// First pending candidate; `None` means no candidate is currently
    /// known, not that the store is empty.
    fn target_key(&self) -> Option<CompoundKey> {
        self.to_evict_next.lock().first().cloned()
    }

    fn algorithm_name(&self) -> &'static str {
        "LFU"
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
