//! Proxy Module
//!
//! The cache orchestrator and the condition gates of its update rules.

mod condition;
mod orchestrator;

pub use condition::{evaluate_conditions, NEGATION_PREFIX};
pub use orchestrator::CacheOrchestrator;
