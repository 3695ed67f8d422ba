//! Cache Maintenance Tasks
//!
//! Background loops that evict expired entries and periodically invalidate
//! whole stores.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::cache::EvictionStore;

/// Spawns the maintenance tasks a store's parameters ask for.
///
/// A store with a time-to-live gets an eviction task running every TTL; a
/// store with an invalidation interval gets an invalidation task. Nothing
/// is spawned when no tokio runtime is current, so stores created from
/// plain threads rely on eviction during writes and reads.
pub fn spawn_maintenance_tasks(name: &str, store: Arc<dyn EvictionStore>) -> Vec<JoinHandle<()>> {
    if Handle::try_current().is_err() {
        debug!(
            "No tokio runtime; cache '{}' runs without maintenance tasks",
            name
        );
        return Vec::new();
    }

    let params = store.parameters().clone();
    let mut handles = Vec::new();
    if let Some(ttl) = params.time_to_live {
        handles.push(spawn_eviction_task(
            name.to_string(),
            Arc::clone(&store),
            ttl,
        ));
    }
    if let Some(interval) = params.invalidation_interval {
        handles.push(spawn_invalidation_task(name.to_string(), store, interval));
    }
    handles
}

/// Spawns a task that calls `evict` on the store every `interval`.
///
/// Must be called from within a tokio runtime. The returned handle aborts
/// the loop during shutdown.
pub fn spawn_eviction_task(
    name: String,
    store: Arc<dyn EvictionStore>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting eviction task for '{}' with interval of {:?}",
            name, interval
        );

        loop {
            sleep_uninterruptibly(interval).await;

            let removed = store.evict();
            if removed > 0 {
                info!("Eviction for '{}': removed {} entries", name, removed);
            } else {
                debug!("Eviction for '{}': nothing to remove", name);
            }
        }
    })
}

/// Spawns a task that calls `invalidate` on the store every `interval`.
pub fn spawn_invalidation_task(
    name: String,
    store: Arc<dyn EvictionStore>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting invalidation task for '{}' with interval of {:?}",
            name, interval
        );

        loop {
            sleep_uninterruptibly(interval).await;

            let size = store.len();
            store.invalidate();
            info!("Invalidated '{}' ({} entries dropped)", name, size);
        }
    })
}

/// Deadline used when a period does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Sleeps until the full duration has elapsed.
///
/// Waking early resumes the wait for the remaining time instead of cutting
/// the period short. Periods too long to represent wait for thirty years.
pub async fn sleep_uninterruptibly(duration: Duration) {
    let now = Instant::now();
    let deadline = now
        .checked_add(duration)
        .unwrap_or_else(|| now + FAR_FUTURE);
    loop {
        sleep_until(deadline).await;
        if Instant::now() >= deadline {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{
        CacheParameters, CompoundKey, EntryIds, Identifier, LruStore, ValuePool,
    };

    fn store(ttl_ms: i64, invalidation_ms: i64) -> Arc<dyn EvictionStore> {
        let params = CacheParameters::builder()
            .capacity(100)
            .time_to_live_ms(ttl_ms)
            .invalidation_interval_ms(invalidation_ms)
            .countdown_from_creation(true)
            .build()
            .unwrap();
        Arc::new(LruStore::new(params, Arc::new(ValuePool::new())))
    }

    fn key(n: i64) -> CompoundKey {
        CompoundKey::new(vec![n.into()])
    }

    #[tokio::test]
    async fn test_eviction_task_removes_expired_entries() {
        let store = store(50, -1);
        store.put(key(1), EntryIds::Single(Identifier::from(1)));

        let handle = spawn_eviction_task("users".to_string(), Arc::clone(&store), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!store.contains(&key(1)), "expired entry should have been evicted");
        assert!(store.stats().evictions >= 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_invalidation_task_clears_store() {
        let store = store(0, 50);
        store.put(key(1), EntryIds::Single(Identifier::from(1)));
        store.put(key(2), EntryIds::Single(Identifier::from(2)));

        let handle =
            spawn_invalidation_task("users".to_string(), Arc::clone(&store), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(store.is_empty());
        assert!(store.stats().invalidations >= 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_maintenance_tasks_follow_parameters() {
        assert_eq!(spawn_maintenance_tasks("none", store(0, -1)).len(), 0);

        let handles = spawn_maintenance_tasks("both", store(60_000, 60_000));
        assert_eq!(handles.len(), 2);
        for handle in &handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_task_can_be_aborted() {
        let handle = spawn_eviction_task("users".to_string(), store(1_000, -1), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_waits_full_duration() {
        let start = Instant::now();
        sleep_uninterruptibly(Duration::from_secs(5)).await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_accepts_unrepresentable_duration() {
        let waited =
            tokio::time::timeout(Duration::from_secs(3_600), sleep_uninterruptibly(Duration::MAX))
                .await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_task_survives_huge_ttl() {
        let store = store(i64::MAX, -1);
        let handles = spawn_maintenance_tasks("forever", Arc::clone(&store));
        assert_eq!(handles.len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(!handles[0].is_finished(), "eviction task should still be waiting");
        handles[0].abort();
    }

    #[test]
    fn test_no_tasks_outside_runtime() {
        assert!(spawn_maintenance_tasks("users", store(1_000, 1_000)).is_empty());
    }
}
