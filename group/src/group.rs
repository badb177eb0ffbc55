//! Cache groups and the load pipeline.
//!
//! A [`Group`] is a named namespace bound to one loader and (optionally)
//! one peer picker. A lookup consults the hot tier, then the main tier,
//! then enters a coalesced load that goes to the owning peer when one is
//! registered and otherwise to the local loader.
//!
//! ```text
//!  get(key)
//!    |-- hot tier ----------------------- hit? return
//!    |-- main tier ---------------------- hit? return
//!    '-- single flight
//!          |-- pick_peer(key) -> peer --- fetch, count stats, maybe
//!          |                              promote to hot
//!          '-- none/self --------------- local loader, populate main
//! ```

use crate::error::{ConfigError, GroupError};
use crate::loader::Getter;
use crate::peer::{PeerGetter, PeerPicker};
use crate::{metrics, HOT_QPS_THRESHOLD, HOT_RATIO};
use ahash::AHashMap;
use cache_store::{ByteView, StoreConfig, Tier, TieredCache, DEFAULT_JITTER_WINDOW, DEFAULT_TTL};
use parking_lot::Mutex;
use singleflight::SingleFlight;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Remote-access tracking for one key that other nodes own.
///
/// The counter is lock-free; creation and removal of the map entry are
/// serialized by the group's stats mutex. An entry is removed when its key
/// is promoted, so a key re-qualifies from scratch after the hot entry
/// eventually falls out.
struct KeyStats {
    first_seen: Instant,
    remote_count: AtomicI64,
}

/// A named cache namespace.
///
/// Groups are created through [`GroupBuilder`] or
/// [`new_group`](crate::new_group), live for the remainder of the process,
/// and are safe to share across threads.
pub struct Group {
    name: String,
    getter: Box<dyn Getter>,
    cache: TieredCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    loader: SingleFlight<ByteView, GroupError>,
    stats: Mutex<AHashMap<String, Arc<KeyStats>>>,
    hot_qps_threshold: i64,
}

impl Group {
    /// Start building a group named `name`.
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(name)
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register the peer picker used to shard keys across the cluster.
    ///
    /// # Panics
    ///
    /// Panics when called a second time; wiring peers twice is a
    /// programmer error.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if self.peers.set(picker).is_err() {
            panic!("register_peers called more than once");
        }
    }

    /// Get the value for `key`.
    ///
    /// Serves from the hot tier, then the main tier, then loads: from the
    /// owning peer when a picker is registered and names one, otherwise
    /// from the group's loader. Concurrent misses for the same key share a
    /// single load.
    pub fn get(&self, key: &str) -> Result<ByteView, GroupError> {
        if key.is_empty() {
            return Err(GroupError::EmptyKey);
        }

        if let Some(value) = self.cache.get(Tier::Hot, key) {
            metrics::HOT_HITS.increment();
            tracing::debug!(group = %self.name, key = %key, "hot cache hit");
            return Ok(value);
        }
        if let Some(value) = self.cache.get(Tier::Main, key) {
            metrics::MAIN_HITS.increment();
            tracing::debug!(group = %self.name, key = %key, "main cache hit");
            return Ok(value);
        }

        metrics::MISSES.increment();
        self.load(key)
    }

    /// Whether `key` currently resides in the hot tier.
    ///
    /// Diagnostic lookup; does not refresh recency.
    pub fn is_hot(&self, key: &str) -> bool {
        self.cache.peek(Tier::Hot, key).is_some()
    }

    /// Coalesced load: each key is fetched once regardless of how many
    /// callers are waiting on it.
    fn load(&self, key: &str) -> Result<ByteView, GroupError> {
        self.loader.run(key, || {
            if let Some(picker) = self.peers.get() {
                if let Some(peer) = picker.pick_peer(key) {
                    match self.get_from_peer(peer.as_ref(), key) {
                        Ok(value) => return Ok(value),
                        Err(e) => {
                            metrics::PEER_ERRORS.increment();
                            tracing::warn!(
                                group = %self.name,
                                key = %key,
                                error = %e,
                                "peer fetch failed, falling back to local load"
                            );
                        }
                    }
                }
            }
            self.get_locally(key)
        })
    }

    /// Load from the local data source and populate the main tier.
    ///
    /// The loader's bytes are defensively copied so the caller of the
    /// loader cannot mutate what the cache stored.
    fn get_locally(&self, key: &str) -> Result<ByteView, GroupError> {
        let bytes = self
            .getter
            .get(key)
            .map_err(|e| GroupError::load(key, e))?;
        let value = ByteView::copy_from(&bytes);
        self.cache.insert(Tier::Main, key, value.clone());
        metrics::LOCAL_LOADS.increment();
        Ok(value)
    }

    /// Fetch from the owning peer.
    ///
    /// The value is *not* written to the main tier; this node does not own
    /// the key. It only lands in the hot tier if sustained remote demand
    /// pushes it over the promotion threshold.
    fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView, GroupError> {
        let bytes = peer
            .get(&self.name, key)
            .map_err(|e| GroupError::peer(key, e))?;
        let value = ByteView::from(bytes);
        metrics::PEER_LOADS.increment();
        self.update_key_stats(key, &value);
        Ok(value)
    }

    /// Track a remote fetch of `key` and promote it once its per-minute
    /// fetch rate reaches the threshold.
    ///
    /// The interval is rounded to whole minutes with a floor of one, so a
    /// burst within the first minute is judged against a one-minute window.
    /// Promotion deletes the stats entry: the key must re-qualify after the
    /// hot entry ages out.
    fn update_key_stats(&self, key: &str, value: &ByteView) {
        let stat = {
            let mut stats = self.stats.lock();
            match stats.get(key) {
                Some(stat) => stat.clone(),
                None => {
                    stats.insert(
                        key.to_owned(),
                        Arc::new(KeyStats {
                            first_seen: Instant::now(),
                            remote_count: AtomicI64::new(1),
                        }),
                    );
                    return;
                }
            }
        };

        let count = stat.remote_count.fetch_add(1, Ordering::Relaxed) + 1;
        let interval_minutes = (stat.first_seen.elapsed().as_secs() as f64 / 60.0)
            .round()
            .max(1.0) as i64;
        let qps = count / interval_minutes;
        if qps >= self.hot_qps_threshold {
            self.cache.insert(Tier::Hot, key, value.clone());
            self.stats.lock().remove(key);
            metrics::HOT_PROMOTIONS.increment();
            tracing::debug!(group = %self.name, key = %key, qps, "promoted to hot tier");
        }
    }

    /// Number of remote keys currently being tracked for promotion.
    ///
    /// Diagnostic counter; promoted keys leave this set, so it reflects
    /// keys still below the threshold.
    pub fn stats_len(&self) -> usize {
        self.stats.lock().len()
    }
}

/// Configures and builds a [`Group`].
///
/// ```
/// use embercache::{BoxError, Group};
/// use std::time::Duration;
///
/// let group = Group::builder("sessions")
///     .cache_bytes(4 * 1024 * 1024)
///     .default_ttl(Duration::from_secs(300))
///     .build(|key: &str| -> Result<Vec<u8>, BoxError> {
///         Ok(key.as_bytes().to_vec())
///     })
///     .unwrap();
/// assert_eq!(group.name(), "sessions");
/// ```
pub struct GroupBuilder {
    name: String,
    cache_bytes: usize,
    default_ttl: Duration,
    jitter_window: Duration,
    hot_ratio: usize,
    hot_qps_threshold: i64,
}

impl GroupBuilder {
    /// Create a builder with the default sizing and promotion settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache_bytes: 0,
            default_ttl: DEFAULT_TTL,
            jitter_window: DEFAULT_JITTER_WINDOW,
            hot_ratio: HOT_RATIO,
            hot_qps_threshold: HOT_QPS_THRESHOLD,
        }
    }

    /// Main-tier capacity in bytes; `0` disables the bound.
    pub fn cache_bytes(mut self, bytes: usize) -> Self {
        self.cache_bytes = bytes;
        self
    }

    /// TTL applied to entries on insert.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Expiry jitter window; `Duration::ZERO` disables jitter.
    pub fn jitter_window(mut self, window: Duration) -> Self {
        self.jitter_window = window;
        self
    }

    /// Main-to-hot capacity ratio (default 8).
    pub fn hot_ratio(mut self, ratio: usize) -> Self {
        self.hot_ratio = ratio;
        self
    }

    /// Per-minute remote fetch rate at which a key is promoted (default 10).
    pub fn hot_qps_threshold(mut self, threshold: i64) -> Self {
        self.hot_qps_threshold = threshold;
        self
    }

    /// Build the group with `getter` as its data source.
    pub fn build(self, getter: impl Getter + 'static) -> Result<Group, ConfigError> {
        if self.hot_ratio == 0 {
            return Err(ConfigError::ZeroHotRatio);
        }
        if self.hot_qps_threshold <= 0 {
            return Err(ConfigError::ZeroQpsThreshold);
        }
        Ok(Group {
            name: self.name,
            getter: Box::new(getter),
            cache: TieredCache::new(
                StoreConfig {
                    max_bytes: self.cache_bytes,
                    default_ttl: self.default_ttl,
                    jitter_window: self.jitter_window,
                },
                self.hot_ratio,
            ),
            peers: OnceLock::new(),
            loader: SingleFlight::new(),
            stats: Mutex::new(AHashMap::new()),
            hot_qps_threshold: self.hot_qps_threshold,
        })
    }
}
