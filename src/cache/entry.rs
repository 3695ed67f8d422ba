//! Stored Entry Module
//!
//! Defines the per-key record a store keeps: the referenced identifier(s)
//! plus creation, access and hit metadata used by the eviction policies.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{CacheParameters, Identifier};

// == Entry Identifiers ==
/// Identifier(s) referenced by one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryIds {
    /// Single-valued cache
    Single(Identifier),
    /// Collection-valued cache, insertion ordered, no duplicates
    Collection(Vec<Identifier>),
}

impl EntryIds {
    /// Builds a collection, dropping duplicates while keeping first occurrence order.
    pub fn collection(ids: impl IntoIterator<Item = Identifier>) -> Self {
        let mut unique: Vec<Identifier> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        EntryIds::Collection(unique)
    }

    /// All referenced identifiers in order.
    pub fn identifiers(&self) -> Vec<Identifier> {
        match self {
            EntryIds::Single(id) => vec![id.clone()],
            EntryIds::Collection(ids) => ids.clone(),
        }
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        match self {
            EntryIds::Single(own) => own == id,
            EntryIds::Collection(ids) => ids.contains(id),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, EntryIds::Collection(_))
    }

    pub fn len(&self) -> usize {
        match self {
            EntryIds::Single(_) => 1,
            EntryIds::Collection(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Stored Entry ==
/// Record held by a store for one key.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Referenced identifier(s)
    pub ids: EntryIds,
    /// Creation timestamp (Unix milliseconds)
    pub created_on: u64,
    /// Last read or write (Unix milliseconds)
    pub last_accessed: u64,
    /// Number of reads served
    pub hits: u64,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a fresh entry stamped with the current time.
    pub fn new(ids: EntryIds) -> Self {
        let now = current_timestamp_ms();
        Self {
            ids,
            created_on: now,
            last_accessed: now,
            hits: 0,
        }
    }

    // == Touch ==
    /// Records a read.
    pub fn touch(&mut self) {
        self.last_accessed = current_timestamp_ms();
        self.hits += 1;
    }

    // == Is Expired ==
    /// Checks the shared TTL rule: expired when `now - reference > ttl`.
    ///
    /// The reference time is the creation time when the store counts down
    /// from creation, otherwise the last access. Entries of stores without
    /// a TTL never expire.
    pub fn is_expired(&self, params: &CacheParameters, now: u64) -> bool {
        match params.ttl_ms() {
            Some(ttl) => {
                let reference = if params.countdown_from_creation {
                    self.created_on
                } else {
                    self.last_accessed
                };
                now.saturating_sub(reference) > ttl
            }
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
