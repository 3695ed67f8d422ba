//! Cache Parameters Module
//!
//! Immutable per-store configuration: capacity, TTL, invalidation interval,
//! eviction thresholds and the policy kind.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{MnemoError, Result};

// == Public Constants ==
/// Fill percentage at which LFU starts computing eviction candidates
pub const DEFAULT_PREEMPTIVE_EVICTION_PERCENTAGE: u8 = 80;

/// Share of capacity removed by one eviction step
pub const DEFAULT_EVICTION_STEP_PERCENTAGE: u8 = 15;

// == Policy Kind ==
/// Eviction policy backing a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Fifo,
    #[default]
    Lru,
    Lfu,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Fifo => write!(f, "FIFO"),
            PolicyKind::Lru => write!(f, "LRU"),
            PolicyKind::Lfu => write!(f, "LFU"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "lru" => Ok(PolicyKind::Lru),
            "lfu" => Ok(PolicyKind::Lfu),
            other => Err(MnemoError::Configuration(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}

// == Cache Parameters ==
/// Store configuration with declarative sentinels already normalized.
///
/// `None` means unbounded for capacity, time-to-live and invalidation
/// interval. Build through [`CacheParameters::builder`] to get the
/// normalization and validation rules applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheParameters {
    /// Eviction policy
    pub policy: PolicyKind,
    /// Maximum number of keys, None = unbounded
    pub capacity: Option<usize>,
    /// Entry lifetime, None = never expires
    #[serde(rename = "time_to_live_ms", serialize_with = "serialize_millis")]
    pub time_to_live: Option<Duration>,
    /// Period of full invalidation, None = never
    #[serde(rename = "invalidation_interval_ms", serialize_with = "serialize_millis")]
    pub invalidation_interval: Option<Duration>,
    /// Fill percentage that triggers LFU candidate computation
    pub preemptive_eviction_percentage: u8,
    /// Share of capacity evicted per step
    pub eviction_step_percentage: u8,
    /// Measure TTL from creation instead of last access
    pub countdown_from_creation: bool,
    /// Entries hold a collection of identifiers
    pub returns_collection: bool,
    /// Split collection-valued keys into one key per element
    pub handle_collection_keys_separately: bool,
}

fn serialize_millis<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

impl Default for CacheParameters {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            capacity: None,
            time_to_live: None,
            invalidation_interval: None,
            preemptive_eviction_percentage: DEFAULT_PREEMPTIVE_EVICTION_PERCENTAGE,
            eviction_step_percentage: DEFAULT_EVICTION_STEP_PERCENTAGE,
            countdown_from_creation: false,
            returns_collection: false,
            handle_collection_keys_separately: false,
        }
    }
}

impl CacheParameters {
    /// Creates a new builder with default values.
    pub fn builder() -> CacheParametersBuilder {
        CacheParametersBuilder::default()
    }

    // == Eviction Step ==
    /// Number of entries one capacity-driven eviction step removes.
    ///
    /// `max(1, floor(capacity * step% / 100))`, or 1 for unbounded stores.
    pub fn eviction_step(&self) -> usize {
        match self.capacity {
            Some(capacity) => percent_of(capacity, self.eviction_step_percentage).max(1),
            None => 1,
        }
    }

    // == Preemptive Threshold ==
    /// Size at which LFU starts preparing eviction candidates.
    pub fn preemptive_threshold(&self) -> Option<usize> {
        self.capacity
            .map(|capacity| percent_of(capacity, self.preemptive_eviction_percentage))
    }

    /// Returns true once `size` has reached the configured capacity.
    pub fn is_at_capacity(&self, size: usize) -> bool {
        matches!(self.capacity, Some(capacity) if size >= capacity)
    }

    /// TTL in milliseconds, None when entries never expire.
    pub fn ttl_ms(&self) -> Option<u64> {
        self.time_to_live.map(|ttl| ttl.as_millis() as u64)
    }
}

/// `floor(value * percentage / 100)` without overflowing for large capacities.
fn percent_of(value: usize, percentage: u8) -> usize {
    let percentage = percentage as usize;
    value / 100 * percentage + value % 100 * percentage / 100
}

// == Builder ==
/// Builder accepting the raw integers found in declarative configuration.
///
/// Non-positive capacity or TTL means unbounded, a negative invalidation
/// interval means never. Out-of-range percentages fall back: the preemptive
/// percentage to its default, the step percentage to 0.
#[derive(Debug, Clone)]
pub struct CacheParametersBuilder {
    policy: PolicyKind,
    capacity: i64,
    time_to_live_ms: i64,
    invalidation_interval_ms: i64,
    preemptive_eviction_percentage: i64,
    eviction_step_percentage: i64,
    countdown_from_creation: bool,
    returns_collection: bool,
    handle_collection_keys_separately: bool,
}

impl Default for CacheParametersBuilder {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            capacity: 0,
            time_to_live_ms: 0,
            invalidation_interval_ms: -1,
            preemptive_eviction_percentage: DEFAULT_PREEMPTIVE_EVICTION_PERCENTAGE as i64,
            eviction_step_percentage: DEFAULT_EVICTION_STEP_PERCENTAGE as i64,
            countdown_from_creation: false,
            returns_collection: false,
            handle_collection_keys_separately: false,
        }
    }
}

impl CacheParametersBuilder {
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn time_to_live_ms(mut self, ttl: i64) -> Self {
        self.time_to_live_ms = ttl;
        self
    }

    pub fn invalidation_interval_ms(mut self, interval: i64) -> Self {
        self.invalidation_interval_ms = interval;
        self
    }

    pub fn preemptive_eviction_percentage(mut self, percentage: i64) -> Self {
        self.preemptive_eviction_percentage = percentage;
        self
    }

    pub fn eviction_step_percentage(mut self, percentage: i64) -> Self {
        self.eviction_step_percentage = percentage;
        self
    }

    pub fn countdown_from_creation(mut self, enable: bool) -> Self {
        self.countdown_from_creation = enable;
        self
    }

    pub fn returns_collection(mut self, enable: bool) -> Self {
        self.returns_collection = enable;
        self
    }

    pub fn handle_collection_keys_separately(mut self, enable: bool) -> Self {
        self.handle_collection_keys_separately = enable;
        self
    }

    /// Normalizes sentinels and validates the combination.
    pub fn build(self) -> Result<CacheParameters> {
        if self.invalidation_interval_ms == 0 {
            return Err(MnemoError::Configuration(
                "invalidation interval must be positive, or negative for never".to_string(),
            ));
        }
        if self.handle_collection_keys_separately && !self.returns_collection {
            return Err(MnemoError::Configuration(
                "separate collection key handling requires a collection-valued cache"
                    .to_string(),
            ));
        }

        let percentage = |raw: i64| (0..=100).contains(&raw).then_some(raw as u8);

        Ok(CacheParameters {
            policy: self.policy,
            capacity: (self.capacity > 0).then_some(self.capacity as usize),
            time_to_live: (self.time_to_live_ms > 0)
                .then(|| Duration::from_millis(self.time_to_live_ms as u64)),
            invalidation_interval: (self.invalidation_interval_ms > 0)
                .then(|| Duration::from_millis(self.invalidation_interval_ms as u64)),
            preemptive_eviction_percentage: percentage(self.preemptive_eviction_percentage)
                .unwrap_or(DEFAULT_PREEMPTIVE_EVICTION_PERCENTAGE),
            eviction_step_percentage: percentage(self.eviction_step_percentage).unwrap_or(0),
            countdown_from_creation: self.countdown_from_creation,
            returns_collection: self.returns_collection,
            handle_collection_keys_separately: self.handle_collection_keys_separately,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unbounded() {
        let params = CacheParameters::builder().build().unwrap();
        assert_eq!(params.capacity, None);
        assert_eq!(params.time_to_live, None);
        assert_eq!(params.invalidation_interval, None);
        assert_eq!(params.preemptive_eviction_percentage, 80);
        assert_eq!(params.eviction_step_percentage, 15);
        assert_eq!(params, CacheParameters::default());
    }

    #[test]
    fn test_sentinels_normalized() {
        let params = CacheParameters::builder()
            .capacity(-5)
            .time_to_live_ms(0)
            .invalidation_interval_ms(-1)
            .build()
            .unwrap();
        assert_eq!(params.capacity, None);
        assert_eq!(params.time_to_live, None);
        assert_eq!(params.invalidation_interval, None);
    }

    #[test]
    fn test_out_of_range_percentages() {
        let params = CacheParameters::builder()
            .preemptive_eviction_percentage(150)
            .eviction_step_percentage(-3)
            .build()
            .unwrap();
        assert_eq!(params.preemptive_eviction_percentage, 80);
        assert_eq!(params.eviction_step_percentage, 0);
    }

    #[test]
    fn test_eviction_step() {
        let params = CacheParameters::builder().capacity(100).build().unwrap();
        assert_eq!(params.eviction_step(), 15);

        let tiny = CacheParameters::builder().capacity(2).build().unwrap();
        assert_eq!(tiny.eviction_step(), 1);

        let zero_step = CacheParameters::builder()
            .capacity(100)
            .eviction_step_percentage(0)
            .build()
            .unwrap();
        assert_eq!(zero_step.eviction_step(), 1);
    }

    #[test]
    fn test_preemptive_threshold() {
        let params = CacheParameters::builder().capacity(50).build().unwrap();
        assert_eq!(params.preemptive_threshold(), Some(40));
        assert!(params.is_at_capacity(50));
        assert!(!params.is_at_capacity(49));
    }

    #[test]
    fn test_huge_capacity_thresholds() {
        let params = CacheParameters::builder()
            .capacity(i64::MAX / 10)
            .build()
            .unwrap();
        let capacity = params.capacity.unwrap();

        assert_eq!(params.eviction_step(), capacity / 100 * 15 + capacity % 100 * 15 / 100);
        assert!(params.eviction_step() < capacity);
        assert_eq!(
            params.preemptive_threshold(),
            Some(capacity / 100 * 80 + capacity % 100 * 80 / 100)
        );
        assert!(!params.is_at_capacity(1));
    }

    #[test]
    fn test_zero_invalidation_interval_rejected() {
        let result = CacheParameters::builder().invalidation_interval_ms(0).build();
        assert!(matches!(result, Err(MnemoError::Configuration(_))));
    }

    #[test]
    fn test_separate_handling_requires_collection() {
        let result = CacheParameters::builder()
            .handle_collection_keys_separately(true)
            .build();
        assert!(matches!(result, Err(MnemoError::Configuration(_))));

        let ok = CacheParameters::builder()
            .returns_collection(true)
            .handle_collection_keys_separately(true)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("lfu".parse::<PolicyKind>().unwrap(), PolicyKind::Lfu);
        assert_eq!("FIFO".parse::<PolicyKind>().unwrap(), PolicyKind::Fifo);
        assert!("arc".parse::<PolicyKind>().is_err());
        assert_eq!(PolicyKind::Lru.to_string(), "LRU");
    }

    #[test]
    fn test_serializes_durations_as_millis() {
        let params = CacheParameters::builder()
            .time_to_live_ms(1_500)
            .build()
            .unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["time_to_live_ms"], 1_500);
        assert!(json["invalidation_interval_ms"].is_null());
        assert!(json["capacity"].is_null());
    }
}
