//! Two-tier thread-safe cache.
//!
//! Composes two [`LruStore`]s behind independent mutexes:
//!
//! - **main**: values this node loaded itself (keys it is authoritative
//!   for)
//! - **hot**: values owned by other nodes that earned local residency
//!   through sustained remote demand
//!
//! The tiers have independent access patterns, so each gets its own lock: a
//! hot-tier hit never contends with main-tier eviction. Neither lock is
//! ever held while the other is taken.

use crate::lru::{LruStore, StoreConfig};
use crate::ByteView;
use parking_lot::Mutex;
use std::time::Duration;

/// Selects which store a [`TieredCache`] operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    /// Locally loaded, authoritative values.
    Main,
    /// Promoted remote values.
    Hot,
}

/// Thread-safe main + hot cache pair.
///
/// Both stores are allocated eagerly at construction; there is no
/// first-use initialization check on the lookup path.
pub struct TieredCache {
    main: Mutex<LruStore>,
    hot: Mutex<LruStore>,
}

impl TieredCache {
    /// Build both tiers from `config`.
    ///
    /// The hot tier inherits the main tier's TTL and jitter settings and is
    /// sized at `config.max_bytes / hot_ratio` (`0` stays unbounded).
    ///
    /// # Panics
    ///
    /// Panics if `hot_ratio` is zero.
    pub fn new(config: StoreConfig, hot_ratio: usize) -> Self {
        assert!(hot_ratio > 0, "hot_ratio must be non-zero");
        let hot_config = StoreConfig {
            max_bytes: config.max_bytes / hot_ratio,
            ..config.clone()
        };
        Self {
            main: Mutex::new(LruStore::with_config(config, None)),
            hot: Mutex::new(LruStore::with_config(hot_config, None)),
        }
    }

    /// Look up `key` in the selected tier, refreshing recency on a hit.
    pub fn get(&self, tier: Tier, key: &str) -> Option<ByteView> {
        self.store(tier).lock().get(key)
    }

    /// Insert into the selected tier with its default TTL.
    pub fn insert(&self, tier: Tier, key: &str, value: ByteView) {
        self.store(tier).lock().insert(key, value);
    }

    /// Insert into the selected tier with an explicit TTL.
    pub fn insert_with_ttl(&self, tier: Tier, key: &str, value: ByteView, ttl: Duration) {
        self.store(tier).lock().insert_with_ttl(key, value, ttl);
    }

    /// Non-mutating lookup: honors expiry, does not touch recency.
    pub fn peek(&self, tier: Tier, key: &str) -> Option<ByteView> {
        self.store(tier).lock().peek(key)
    }

    /// Number of entries in the selected tier.
    pub fn len(&self, tier: Tier) -> usize {
        self.store(tier).lock().len()
    }

    /// Whether the selected tier holds no entries.
    pub fn is_empty(&self, tier: Tier) -> bool {
        self.store(tier).lock().is_empty()
    }

    /// Bytes accounted to the selected tier.
    pub fn used_bytes(&self, tier: Tier) -> usize {
        self.store(tier).lock().used_bytes()
    }

    fn store(&self, tier: Tier) -> &Mutex<LruStore> {
        match tier {
            Tier::Main => &self.main,
            Tier::Hot => &self.hot,
        }
    }
}
