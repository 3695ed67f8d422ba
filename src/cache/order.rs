//! Order Tracker Module
//!
//! Tracks key order for queue-based eviction (insertion order for FIFO,
//! recency for LRU).

use std::collections::{BTreeMap, HashMap};

use crate::cache::CompoundKey;

// == Order Tracker ==
/// Keeps keys ordered from head (next to evict) to tail (newest).
///
/// Each key carries a monotonically increasing sequence number; moving a
/// key to the tail re-stamps it, so touch and remove stay logarithmic.
#[derive(Debug, Default)]
pub struct OrderTracker {
    /// Sequence number → key, head first
    order: BTreeMap<u64, CompoundKey>,
    /// Key → its current sequence number
    positions: HashMap<CompoundKey, u64>,
    next_seq: u64,
}

impl OrderTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Moves a key to the tail, appending it when new.
    pub fn touch(&mut self, key: &CompoundKey) {
        self.remove(key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.positions.insert(key.clone(), seq);
    }

    // == Append ==
    /// Appends a key at the tail unless it is already tracked.
    pub fn append(&mut self, key: &CompoundKey) {
        if !self.positions.contains_key(key) {
            self.touch(key);
        }
    }

    // == Refresh ==
    /// Moves an already tracked key to the tail; untracked keys are ignored.
    pub fn refresh(&mut self, key: &CompoundKey) -> bool {
        if self.positions.contains_key(key) {
            self.touch(key);
            true
        } else {
            false
        }
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &CompoundKey) {
        if let Some(seq) = self.positions.remove(key) {
            self.order.remove(&seq);
        }
    }

    // == Pop Oldest ==
    /// Returns and removes the key at the head.
    pub fn pop_oldest(&mut self) -> Option<CompoundKey> {
        let (_, key) = self.order.pop_first()?;
        self.positions.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the key at the head without removing it.
    pub fn peek_oldest(&self) -> Option<&CompoundKey> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, key: &CompoundKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }
}
