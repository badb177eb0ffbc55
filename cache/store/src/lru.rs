//! Size-accounted LRU store with per-entry expiry.
//!
//! Entries live in slab-backed node storage linked into an intrusive
//! recency list (front = most recently used). A hash index maps each key to
//! its node. Capacity is accounted in bytes (`len(key) + len(value)` per
//! entry) rather than entry count.
//!
//! Eviction is TTL-aware: when the store is over budget it scans from the
//! least-recently-used end and removes the first *expired* entry it finds.
//! If every entry is still live the store is allowed to exceed its budget;
//! the bound is traded for never dropping a live entry on size pressure
//! alone.

use crate::byteview::ByteView;
use crate::{DEFAULT_JITTER_WINDOW, DEFAULT_TTL};
use ahash::AHashMap;
use rand::Rng;
use slab::Slab;
use std::time::{Duration, Instant};

/// Sentinel for "no node" in the recency list links.
const NIL: usize = usize::MAX;

/// Callback invoked for every entry removed by eviction or expiry.
///
/// Runs while the store's lock is held; the callback must not call back
/// into the store.
pub type EvictCallback = Box<dyn FnMut(&str, &ByteView) + Send>;

/// Sizing and expiry settings for one [`LruStore`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Capacity in bytes; `0` disables the bound entirely.
    pub max_bytes: usize,

    /// TTL applied by [`LruStore::insert`].
    pub default_ttl: Duration,

    /// Upper bound (exclusive) of the random per-insert expiry extension,
    /// in whole seconds. `Duration::ZERO` disables jitter.
    pub jitter_window: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_bytes: 0,
            default_ttl: DEFAULT_TTL,
            jitter_window: DEFAULT_JITTER_WINDOW,
        }
    }
}

struct Entry {
    key: String,
    value: ByteView,
    expire: Instant,
    /// Toward the most-recently-used end.
    prev: usize,
    /// Toward the least-recently-used end.
    next: usize,
}

impl Entry {
    #[inline]
    fn size(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

/// Bounded key/value store with LRU recency ordering and per-entry expiry.
///
/// Not internally synchronized; callers wrap it in a lock (see
/// [`TieredCache`](crate::TieredCache)).
pub struct LruStore {
    config: StoreConfig,
    used_bytes: usize,
    entries: Slab<Entry>,
    index: AHashMap<String, usize>,
    /// Most recently used node, or `NIL` when empty.
    head: usize,
    /// Least recently used node, or `NIL` when empty.
    tail: usize,
    on_evict: Option<EvictCallback>,
}

impl LruStore {
    /// Create a store with `max_bytes` capacity (`0` = unbounded) and the
    /// given default TTL. The jitter window defaults to
    /// [`DEFAULT_JITTER_WINDOW`].
    pub fn new(max_bytes: usize, on_evict: Option<EvictCallback>, default_ttl: Duration) -> Self {
        Self::with_config(
            StoreConfig {
                max_bytes,
                default_ttl,
                jitter_window: DEFAULT_JITTER_WINDOW,
            },
            on_evict,
        )
    }

    /// Create a store from a full [`StoreConfig`].
    pub fn with_config(config: StoreConfig, on_evict: Option<EvictCallback>) -> Self {
        Self {
            config,
            used_bytes: 0,
            entries: Slab::new(),
            index: AHashMap::new(),
            head: NIL,
            tail: NIL,
            on_evict,
        }
    }

    /// Insert `value` under `key` using the store's default TTL.
    pub fn insert(&mut self, key: &str, value: ByteView) {
        self.insert_with_ttl(key, value, self.config.default_ttl);
    }

    /// Insert `value` under `key`, expiring after `ttl` plus jitter.
    ///
    /// An existing entry is moved to the front of the recency list, its
    /// value replaced, and its expiry *extended*: if the newly computed
    /// expiry is earlier than the current one, the current one stands, so
    /// frequent writes never shorten a hot key's life.
    ///
    /// After the insert, expired entries are evicted from the LRU end until
    /// the store is back under budget or no expired entry remains.
    pub fn insert_with_ttl(&mut self, key: &str, value: ByteView, ttl: Duration) {
        let expire = Instant::now() + ttl + self.jitter();

        if let Some(&idx) = self.index.get(key) {
            self.detach(idx);
            self.push_front(idx);
            let entry = &mut self.entries[idx];
            self.used_bytes = self.used_bytes - entry.value.len() + value.len();
            entry.value = value;
            if expire > entry.expire {
                entry.expire = expire;
            }
        } else {
            let size = key.len() + value.len();
            let idx = self.entries.insert(Entry {
                key: key.to_owned(),
                value,
                expire,
                prev: NIL,
                next: NIL,
            });
            self.index.insert(key.to_owned(), idx);
            self.push_front(idx);
            self.used_bytes += size;
        }

        if self.config.max_bytes > 0 {
            while self.used_bytes > self.config.max_bytes {
                if !self.remove_oldest() {
                    break;
                }
            }
        }
    }

    /// Look up `key`, refreshing its recency on a hit.
    ///
    /// An expired entry is removed (firing the eviction callback) and
    /// reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let idx = *self.index.get(key)?;
        if self.entries[idx].expire <= Instant::now() {
            tracing::debug!(key = %key, "cache entry expired");
            self.remove_entry(idx);
            return None;
        }
        self.detach(idx);
        self.push_front(idx);
        Some(self.entries[idx].value.clone())
    }

    /// Look up `key` without touching recency or removing anything.
    ///
    /// Expired entries report a miss but stay in place until a mutating
    /// operation observes them.
    pub fn peek(&self, key: &str) -> Option<ByteView> {
        let idx = *self.index.get(key)?;
        let entry = &self.entries[idx];
        if entry.expire <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Evict the least-recently-used *expired* entry.
    ///
    /// Scans from the LRU end toward the front and removes the first
    /// expired entry encountered. Returns `false` when every entry is still
    /// live, in which case nothing is removed.
    pub fn remove_oldest(&mut self) -> bool {
        let now = Instant::now();
        let mut cur = self.tail;
        while cur != NIL {
            let newer = self.entries[cur].prev;
            if self.entries[cur].expire <= now {
                self.remove_entry(cur);
                return true;
            }
            cur = newer;
        }
        false
    }

    /// Number of entries currently present (live or not yet observed as
    /// expired).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently accounted to entries (`len(key) + len(value)` each).
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Configured capacity in bytes; `0` means unbounded.
    pub fn max_bytes(&self) -> usize {
        self.config.max_bytes
    }

    fn jitter(&self) -> Duration {
        let window = self.config.jitter_window.as_secs();
        if window == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(rand::thread_rng().gen_range(0..window))
    }

    fn remove_entry(&mut self, idx: usize) {
        self.detach(idx);
        let entry = self.entries.remove(idx);
        self.index.remove(&entry.key);
        self.used_bytes -= entry.size();
        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(&entry.key, &entry.value);
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let entry = &self.entries[idx];
            (entry.prev, entry.next)
        };
        if prev != NIL {
            self.entries[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.entries[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let entry = &mut self.entries[idx];
            entry.prev = NIL;
            entry.next = old_head;
        }
        if old_head != NIL {
            self.entries[old_head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread::sleep;

    fn no_jitter(max_bytes: usize, ttl: Duration) -> StoreConfig {
        StoreConfig {
            max_bytes,
            default_ttl: ttl,
            jitter_window: Duration::ZERO,
        }
    }

    fn recency_keys(store: &LruStore) -> Vec<String> {
        let mut keys = Vec::new();
        let mut cur = store.head;
        while cur != NIL {
            keys.push(store.entries[cur].key.clone());
            cur = store.entries[cur].next;
        }
        keys
    }

    #[test]
    fn test_get_hit_and_miss() {
        let mut store = LruStore::with_config(no_jitter(0, Duration::from_secs(60)), None);
        store.insert("key1", ByteView::from("1234"));

        assert_eq!(store.get("key1").unwrap().as_ref(), b"1234");
        assert!(store.get("key2").is_none());
    }

    #[test]
    fn test_eviction_removes_expired_oldest() {
        let cap = "key1key2value1value2".len();
        let mut store = LruStore::with_config(no_jitter(cap, Duration::from_millis(1)), None);

        store.insert("key1", ByteView::from("value1"));
        store.insert("key2", ByteView::from("value2"));
        sleep(Duration::from_millis(10));
        store.insert("key3", ByteView::from("value3"));

        assert!(store.get("key1").is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_no_eviction_while_entries_live() {
        let mut store = LruStore::with_config(no_jitter(10, Duration::from_secs(60)), None);

        // 20 bytes against a 10-byte budget; nothing is expired so the
        // scan finds no victim and the entry stays.
        store.insert("oversized", ByteView::from("0123456789a"));

        assert_eq!(store.len(), 1);
        assert!(store.used_bytes() > store.max_bytes());
        assert_eq!(store.get("oversized").unwrap().as_ref(), b"0123456789a");
    }

    #[test]
    fn test_on_evict_callback_order() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let seen = evicted.clone();
        let callback: EvictCallback = Box::new(move |key, _value| {
            seen.lock().unwrap().push(key.to_owned());
        });

        let mut store =
            LruStore::with_config(no_jitter(10, Duration::from_millis(1)), Some(callback));

        store.insert("key1", ByteView::from("123456"));
        sleep(Duration::from_millis(10));
        store.insert("k2", ByteView::from("k2"));
        sleep(Duration::from_millis(10));
        store.insert("k3", ByteView::from("k3"));
        store.insert("k4", ByteView::from("k4"));

        assert_eq!(*evicted.lock().unwrap(), vec!["key1", "k2"]);
    }

    #[test]
    fn test_expired_get_fires_callback() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let seen = evicted.clone();
        let callback: EvictCallback = Box::new(move |key, _value| {
            seen.lock().unwrap().push(key.to_owned());
        });

        let mut store =
            LruStore::with_config(no_jitter(0, Duration::from_millis(1)), Some(callback));
        store.insert("key", ByteView::from("value"));
        sleep(Duration::from_millis(10));

        assert!(store.get("key").is_none());
        assert_eq!(store.len(), 0);
        assert_eq!(*evicted.lock().unwrap(), vec!["key"]);
    }

    #[test]
    fn test_replace_updates_size_accounting() {
        let mut store = LruStore::with_config(no_jitter(0, Duration::from_secs(60)), None);

        store.insert("key", ByteView::from("1"));
        store.insert("key", ByteView::from("111"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.used_bytes(), "key".len() + "111".len());
        assert_eq!(store.get("key").unwrap().as_ref(), b"111");
    }

    #[test]
    fn test_ttl_extension_on_repeat_insert() {
        let mut store = LruStore::with_config(no_jitter(0, Duration::from_millis(300)), None);

        store.insert("key", ByteView::from("value"));
        sleep(Duration::from_millis(200));
        store.insert("key", ByteView::from("value"));
        sleep(Duration::from_millis(200));

        // 400ms after the first insert; the second insert pushed expiry
        // out to the 500ms mark.
        assert!(store.get("key").is_some());

        sleep(Duration::from_millis(200));
        assert!(store.get("key").is_none());
    }

    #[test]
    fn test_repeat_insert_never_shortens_ttl() {
        let mut store = LruStore::with_config(no_jitter(0, Duration::from_secs(60)), None);

        store.insert("key", ByteView::from("value"));
        store.insert_with_ttl("key", ByteView::from("value"), Duration::from_millis(1));
        sleep(Duration::from_millis(10));

        // The 1ms re-insert did not pull expiry earlier than the original
        // 60s deadline.
        assert!(store.get("key").is_some());
    }

    #[test]
    fn test_zero_max_bytes_is_unbounded() {
        let evictions = Arc::new(Mutex::new(0usize));
        let count = evictions.clone();
        let callback: EvictCallback = Box::new(move |_key, _value| {
            *count.lock().unwrap() += 1;
        });

        let mut store =
            LruStore::with_config(no_jitter(0, Duration::from_secs(60)), Some(callback));
        for i in 0..100 {
            store.insert(&format!("key{i}"), ByteView::from("value"));
        }

        assert_eq!(store.len(), 100);
        assert_eq!(*evictions.lock().unwrap(), 0);
    }

    #[test]
    fn test_used_bytes_matches_entry_sizes() {
        let mut store = LruStore::with_config(no_jitter(0, Duration::from_secs(60)), None);

        store.insert("a", ByteView::from("one"));
        store.insert("bb", ByteView::from("two"));
        store.insert("ccc", ByteView::from("three"));
        store.insert("a", ByteView::from("replaced"));
        let _ = store.get("bb");

        let expected: usize = store.entries.iter().map(|(_, e)| e.size()).sum();
        assert_eq!(store.used_bytes(), expected);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_recency_order() {
        let mut store = LruStore::with_config(no_jitter(0, Duration::from_secs(60)), None);

        store.insert("a", ByteView::from("1"));
        store.insert("b", ByteView::from("2"));
        store.insert("c", ByteView::from("3"));
        assert_eq!(recency_keys(&store), vec!["c", "b", "a"]);

        let _ = store.get("a");
        assert_eq!(recency_keys(&store), vec!["a", "c", "b"]);

        // peek must not reorder
        let _ = store.peek("b");
        assert_eq!(recency_keys(&store), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_peek_honors_expiry_without_removing() {
        let mut store = LruStore::with_config(no_jitter(0, Duration::from_millis(1)), None);
        store.insert("key", ByteView::from("value"));
        sleep(Duration::from_millis(10));

        assert!(store.peek("key").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_oldest_on_empty_store() {
        let mut store = LruStore::with_config(no_jitter(10, Duration::from_secs(60)), None);
        assert!(!store.remove_oldest());
    }
}
