//! Cache Registry Module
//!
//! Owns the named stores of one engine and the value pool they share.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{
    CacheParameters, CacheStats, EvictionStore, FifoStore, LfuStore, LruStore, PolicyKind,
    ValuePool,
};
use crate::error::{MnemoError, Result};
use crate::tasks::spawn_maintenance_tasks;

// == Store Factory ==
/// Builds a store for the policy named in the parameters.
pub fn new_store(params: CacheParameters, pool: Arc<ValuePool>) -> Arc<dyn EvictionStore> {
    match params.policy {
        PolicyKind::Fifo => Arc::new(FifoStore::new(params, pool)),
        PolicyKind::Lru => Arc::new(LruStore::new(params, pool)),
        PolicyKind::Lfu => Arc::new(LfuStore::new(params, pool)),
    }
}

// == Cache Registry ==
/// Named stores plus their maintenance tasks.
///
/// Maintenance tasks are spawned only when a tokio runtime is current at
/// creation time; they are aborted on [`CacheRegistry::shutdown`] or drop.
#[derive(Debug)]
pub struct CacheRegistry {
    caches: DashMap<String, Arc<dyn EvictionStore>>,
    pool: Arc<ValuePool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheRegistry {
    // == Constructor ==
    pub fn new() -> Self {
        Self::with_pool(Arc::new(ValuePool::new()))
    }

    /// Creates a registry whose stores share an existing pool.
    pub fn with_pool(pool: Arc<ValuePool>) -> Self {
        Self {
            caches: DashMap::new(),
            pool,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn pool(&self) -> &Arc<ValuePool> {
        &self.pool
    }

    // == Create Cache ==
    /// Creates a named store, or returns the existing one of that name.
    ///
    /// A second creation with different parameters keeps the first store's
    /// parameters.
    pub fn create_cache(
        &self,
        name: &str,
        params: CacheParameters,
    ) -> Result<Arc<dyn EvictionStore>> {
        if name.trim().is_empty() {
            return Err(MnemoError::Configuration(
                "cache name cannot be empty".to_string(),
            ));
        }

        let store = match self.caches.entry(name.to_string()) {
            Entry::Occupied(occupied) => {
                let existing = Arc::clone(occupied.get());
                if existing.parameters() != &params {
                    warn!(
                        "Cache '{}' already exists with different parameters; keeping the original",
                        name
                    );
                }
                return Ok(existing);
            }
            Entry::Vacant(vacant) => {
                let store = new_store(params, Arc::clone(&self.pool));
                vacant.insert(Arc::clone(&store));
                store
            }
        };

        info!(
            "Created {} cache '{}' (capacity={:?}, ttl={:?}, invalidation={:?})",
            store.algorithm_name(),
            name,
            store.parameters().capacity,
            store.parameters().time_to_live,
            store.parameters().invalidation_interval
        );

        let handles = spawn_maintenance_tasks(name, Arc::clone(&store));
        self.tasks.lock().extend(handles);

        Ok(store)
    }

    // == Get ==
    /// Looks up a store by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn EvictionStore>> {
        self.caches.get(name).map(|store| Arc::clone(store.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Cache names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Stats of every store, sorted by cache name.
    pub fn stats(&self) -> Vec<(String, &'static str, CacheStats)> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                let store = self.get(&name)?;
                Some((name, store.algorithm_name(), store.stats()))
            })
            .collect()
    }

    /// Invalidates every store.
    pub fn invalidate_all(&self) {
        for store in self.caches.iter() {
            store.invalidate();
        }
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    // == Shutdown ==
    /// Aborts every maintenance task.
    pub fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        if !handles.is_empty() {
            info!("Stopping {} maintenance tasks", handles.len());
        }
        for handle in handles {
            handle.abort();
        }
    }

    /// Number of maintenance tasks still registered.
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Drop for CacheRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
