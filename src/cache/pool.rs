//! Value Pool Module
//!
//! Shared, reference-counted store of domain objects, deduplicated by
//! identifier across every cache of a registry.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use crate::cache::Identifier;

// == Pooled Value ==
/// A domain object plus the number of (cache, key) registrations
/// currently referencing it.
#[derive(Debug, Clone)]
pub struct PooledValue {
    pub value: Value,
    pub usage: usize,
}

// == Value Pool ==
/// Identifier → value map with per-identifier usage counters.
///
/// A pooled value exists iff its usage counter is positive. Every counter
/// update is a single atomic read-modify-write on the identifier's shard.
#[derive(Debug, Default)]
pub struct ValuePool {
    values: DashMap<Identifier, PooledValue>,
}

impl ValuePool {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns the pooled value for an identifier.
    pub fn get(&self, id: &Identifier) -> Option<Value> {
        self.values.get(id).map(|pooled| pooled.value.clone())
    }

    // == Get All ==
    /// Returns the pooled values for the identifiers, skipping misses.
    pub fn get_all(&self, ids: &[Identifier]) -> Vec<Value> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    // == Put ==
    /// Upserts the value and, for a new registration, increments its usage.
    ///
    /// A non-registering put only refreshes a value that is already pooled;
    /// it never creates an entry nobody references.
    pub fn put(&self, id: Identifier, value: Value, is_new_registration: bool) {
        match self.values.entry(id) {
            Entry::Occupied(mut occupied) => {
                let pooled = occupied.get_mut();
                pooled.value = value;
                if is_new_registration {
                    pooled.usage += 1;
                }
            }
            Entry::Vacant(vacant) => {
                if is_new_registration {
                    trace!("Pooling new value {}", vacant.key());
                    vacant.insert(PooledValue { value, usage: 1 });
                }
            }
        }
    }

    // == Retain ==
    /// Adds a registration to an already pooled identifier.
    ///
    /// Returns false when the identifier is not pooled.
    pub fn retain(&self, id: &Identifier) -> bool {
        match self.values.get_mut(id) {
            Some(mut pooled) => {
                pooled.usage += 1;
                true
            }
            None => false,
        }
    }

    // == Release ==
    /// Drops one registration; the value leaves the pool at zero.
    ///
    /// Releasing an unknown identifier is a no-op.
    pub fn release_one(&self, id: &Identifier) {
        let removed = self.values.remove_if_mut(id, |_, pooled| {
            pooled.usage = pooled.usage.saturating_sub(1);
            pooled.usage == 0
        });
        if removed.is_some() {
            trace!("Released last registration of {}", id);
        }
    }

    /// Drops one registration for each identifier.
    pub fn release_many<'a>(&self, ids: impl IntoIterator<Item = &'a Identifier>) {
        for id in ids {
            self.release_one(id);
        }
    }

    // == Usage ==
    /// Current registration count, 0 for unknown identifiers.
    pub fn usage(&self, id: &Identifier) -> usize {
        self.values.get(id).map(|pooled| pooled.usage).unwrap_or(0)
    }

    // == Size ==
    /// Number of pooled values.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_put_and_get() {
        let pool = ValuePool::new();
        pool.put(Identifier::from(1), json!({"id": 1}), true);

        assert_eq!(pool.get(&Identifier::from(1)), Some(json!({"id": 1})));
        assert_eq!(pool.usage(&Identifier::from(1)), 1);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_put_without_registration_does_not_create() {
        let pool = ValuePool::new();
        pool.put(Identifier::from(1), json!("a"), false);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_put_without_registration_refreshes_value() {
        let pool = ValuePool::new();
        pool.put(Identifier::from(1), json!("a"), true);
        pool.put(Identifier::from(1), json!("b"), false);

        assert_eq!(pool.get(&Identifier::from(1)), Some(json!("b")));
        assert_eq!(pool.usage(&Identifier::from(1)), 1);
    }

    #[test]
    fn test_release_removes_at_zero() {
        let pool = ValuePool::new();
        let id = Identifier::from("u1");
        pool.put(id.clone(), json!("x"), true);
        pool.put(id.clone(), json!("x"), true);

        pool.release_one(&id);
        assert_eq!(pool.usage(&id), 1);
        assert!(pool.get(&id).is_some());

        pool.release_one(&id);
        assert!(pool.get(&id).is_none());
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let pool = ValuePool::new();
        pool.release_one(&Identifier::from(404));
        assert_eq!(pool.usage(&Identifier::from(404)), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_get_all_skips_misses() {
        let pool = ValuePool::new();
        pool.put(Identifier::from(1), json!("a"), true);
        pool.put(Identifier::from(3), json!("c"), true);

        let ids = vec![Identifier::from(1), Identifier::from(2), Identifier::from(3)];
        assert_eq!(pool.get_all(&ids), vec![json!("a"), json!("c")]);
    }

    #[test]
    fn test_retain_only_existing() {
        let pool = ValuePool::new();
        assert!(!pool.retain(&Identifier::from(1)));

        pool.put(Identifier::from(1), json!("a"), true);
        assert!(pool.retain(&Identifier::from(1)));
        assert_eq!(pool.usage(&Identifier::from(1)), 2);
    }

    #[test]
    fn test_concurrent_registrations_balance() {
        let pool = Arc::new(ValuePool::new());
        let id = Identifier::from(9);
        pool.put(id.clone(), json!("guard"), true);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let id = id.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        pool.put(id.clone(), json!("v"), true);
                        pool.release_one(&id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.usage(&id), 1);
        pool.release_one(&id);
        assert!(pool.is_empty());
    }
}
