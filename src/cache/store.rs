//! Store Module
//!
//! Common contract of the eviction-policy stores and the shared core they
//! are built on: a concurrent key → entry map coupled to the value pool.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{error, trace};

use crate::cache::{
    current_timestamp_ms, CacheParameters, CacheStats, CompoundKey, EntryIds, Identifier,
    StatsRecorder, StoredEntry, ValuePool,
};
use crate::error::MnemoError;

// == Eviction Store ==
/// Contract shared by the FIFO, LRU and LFU stores.
///
/// Every removal of an entry releases its identifiers in the value pool and
/// every identifier newly referenced by a key is retained there, so pool
/// usage counters always match the live references. Capacity is a soft
/// bound under concurrent writers; the next eviction pass corrects any
/// overshoot.
pub trait EvictionStore: Send + Sync + fmt::Debug {
    /// Stores identifier(s) under a key, replacing any previous entry.
    fn put(&self, key: CompoundKey, ids: EntryIds);

    /// Returns the identifier(s) of a live entry.
    fn get(&self, key: &CompoundKey) -> Option<EntryIds>;

    /// Best-effort batch lookup, one result per key.
    fn get_all(&self, keys: &[CompoundKey]) -> Vec<Option<EntryIds>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Unions identifiers into the collection at a key, creating it if absent.
    fn merge(&self, key: &CompoundKey, ids: Vec<Identifier>);

    /// Unions one identifier into every collection entry.
    fn merge_into_all(&self, id: &Identifier);

    /// Drops a key; returns whether it was present.
    fn remove(&self, key: &CompoundKey) -> bool;

    /// Drops an identifier from the collection at `key`, or from every
    /// collection when no key is given.
    fn remove_identifier_from_collection(&self, key: Option<&CompoundKey>, id: &Identifier);

    /// Runs one policy-driven eviction pass; returns the number of entries removed.
    fn evict(&self) -> usize;

    /// Removes every entry.
    fn invalidate(&self);

    /// Key most eligible for the next eviction, if one is known.
    fn target_key(&self) -> Option<CompoundKey>;

    fn algorithm_name(&self) -> &'static str;

    fn contains(&self, key: &CompoundKey) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;

    fn parameters(&self) -> &CacheParameters;
}

// == Lookup ==
/// Outcome of reading the shared map.
#[derive(Debug)]
pub(crate) enum Lookup {
    Hit(EntryIds),
    Expired,
    Miss,
}

// == Store Core ==
/// Map, pool handle, parameters and counters shared by every policy.
///
/// Policy-specific ordering lives in the policy stores; the core only keeps
/// the entries and the pool registrations consistent.
#[derive(Debug)]
pub(crate) struct StoreCore {
    pub params: CacheParameters,
    pub entries: DashMap<CompoundKey, StoredEntry>,
    pub pool: Arc<ValuePool>,
    pub stats: StatsRecorder,
}

impl StoreCore {
    pub fn new(params: CacheParameters, pool: Arc<ValuePool>) -> Self {
        Self {
            params,
            entries: DashMap::new(),
            pool,
            stats: StatsRecorder::new(),
        }
    }

    // == Insert ==
    /// Writes an entry; returns true when the key was new.
    ///
    /// Identifiers the key did not reference before are retained in the
    /// pool, identifiers no longer referenced are released.
    pub fn insert(&self, key: CompoundKey, ids: EntryIds) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let previous = std::mem::replace(&mut entry.ids, ids);
                entry.last_accessed = current_timestamp_ms();
                for id in entry.ids.identifiers() {
                    if !previous.contains(&id) {
                        self.pool.retain(&id);
                    }
                }
                for id in previous.identifiers() {
                    if !entry.ids.contains(&id) {
                        self.pool.release_one(&id);
                    }
                }
                false
            }
            Entry::Vacant(vacant) => {
                for id in ids.identifiers() {
                    self.pool.retain(&id);
                }
                vacant.insert(StoredEntry::new(ids));
                true
            }
        }
    }

    // == Lookup ==
    /// Reads a key, counting hits and misses.
    ///
    /// Hits refresh the entry's access metadata. An expired entry is
    /// reported as such and left for the caller to remove, so the caller can
    /// keep its ordering structure in step.
    pub fn lookup(&self, key: &CompoundKey) -> Lookup {
        let now = current_timestamp_ms();
        let outcome = match self.entries.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired(&self.params, now) {
                    Lookup::Expired
                } else {
                    entry.touch();
                    Lookup::Hit(entry.ids.clone())
                }
            }
            None => Lookup::Miss,
        };
        match outcome {
            Lookup::Hit(_) => self.stats.record_hit(),
            _ => self.stats.record_miss(),
        }
        outcome
    }

    // == Merge ==
    /// Unions identifiers into a collection entry; returns true when the key was new.
    pub fn merge(&self, key: &CompoundKey, ids: Vec<Identifier>) -> bool {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.last_accessed = current_timestamp_ms();
                match &mut entry.ids {
                    EntryIds::Collection(existing) => {
                        for id in ids {
                            if !existing.contains(&id) {
                                self.pool.retain(&id);
                                existing.push(id);
                            }
                        }
                    }
                    EntryIds::Single(_) => {
                        trace!("Ignoring merge into single-valued key {}", key);
                    }
                }
                false
            }
            Entry::Vacant(vacant) => {
                let ids = EntryIds::collection(ids);
                for id in ids.identifiers() {
                    self.pool.retain(&id);
                }
                vacant.insert(StoredEntry::new(ids));
                true
            }
        }
    }

    // == Merge Into All ==
    /// Unions one identifier into every collection entry.
    pub fn merge_into_all(&self, id: &Identifier) {
        for mut entry in self.entries.iter_mut() {
            if let EntryIds::Collection(existing) = &mut entry.ids {
                if !existing.contains(id) {
                    self.pool.retain(id);
                    existing.push(id.clone());
                }
            }
        }
    }

    // == Take ==
    /// Removes an entry and releases its pool registrations.
    pub fn take(&self, key: &CompoundKey) -> Option<StoredEntry> {
        let (_, entry) = self.entries.remove(key)?;
        self.pool.release_many(entry.ids.identifiers().iter());
        Some(entry)
    }

    // == Evict Tracked ==
    /// Removes a key taken from a policy's ordering structure.
    ///
    /// A tracked key missing from the map means the ordering and the map
    /// disagree; that is logged as an invariant violation and reported as
    /// nothing removed.
    pub fn evict_tracked(&self, key: &CompoundKey, algorithm: &str) -> bool {
        if self.take(key).is_some() {
            return true;
        }
        let violation = MnemoError::InternalInvariant(format!(
            "{} ordering held key {} that is absent from the entry map",
            algorithm, key
        ));
        error!("{}", violation);
        false
    }

    // == Remove Identifier ==
    /// Drops an identifier from one collection entry or from all of them.
    pub fn remove_identifier(&self, key: Option<&CompoundKey>, id: &Identifier) {
        let strip = |entry: &mut StoredEntry| {
            if let EntryIds::Collection(existing) = &mut entry.ids {
                let before = existing.len();
                existing.retain(|held| held != id);
                if existing.len() < before {
                    self.pool.release_one(id);
                }
            }
        };

        match key {
            Some(key) => {
                if let Some(mut entry) = self.entries.get_mut(key) {
                    strip(&mut *entry);
                }
            }
            None => {
                for mut entry in self.entries.iter_mut() {
                    strip(&mut *entry);
                }
            }
        }
    }

    // == Expired Keys ==
    /// Keys whose entries have outlived the TTL.
    pub fn expired_keys(&self, now: u64) -> Vec<CompoundKey> {
        if self.params.time_to_live.is_none() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|entry| entry.value().is_expired(&self.params, now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    // == Clear ==
    /// Removes every entry; returns how many were removed.
    pub fn clear(&self) -> usize {
        let keys: Vec<CompoundKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.iter().filter(|key| self.take(key).is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn snapshot(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }
}
