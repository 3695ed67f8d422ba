//! Background Tasks Module
//!
//! Per-cache maintenance loops that run while a tokio runtime is available.
//!
//! # Tasks
//! - Eviction: runs the store's eviction pass once per time-to-live
//! - Invalidation: clears the store once per invalidation interval

mod maintenance;

pub use maintenance::{
    sleep_uninterruptibly, spawn_eviction_task, spawn_invalidation_task, spawn_maintenance_tasks,
};
