//! Bounded in-memory storage for the cache node.
//!
//! This crate provides the two storage building blocks every cache node
//! carries:
//!
//! - **LruStore**: a size-accounted key/value map with LRU recency ordering,
//!   per-entry expiry with jittered TTLs, and an eviction callback hook
//! - **TieredCache**: two `LruStore`s (main and hot) behind independent
//!   locks, composed into the node's local storage
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------+
//! |              TieredCache                  |
//! |                                           |
//! |  +------------------+  +---------------+  |
//! |  | Main tier        |  | Hot tier      |  |
//! |  | - owned keys     |  | - remote keys |  |
//! |  | - max_bytes      |  | - max_bytes/8 |  |
//! |  +------------------+  +---------------+  |
//! |    one mutex each, never held together    |
//! +-------------------------------------------+
//! ```
//!
//! Values are [`ByteView`]s: immutable byte sequences that are cheap to
//! clone, so a cache hit never copies the payload.
//!
//! # Example
//!
//! ```
//! use cache_store::{ByteView, StoreConfig, Tier, TieredCache};
//!
//! let cache = TieredCache::new(
//!     StoreConfig {
//!         max_bytes: 64 * 1024,
//!         ..StoreConfig::default()
//!     },
//!     8,
//! );
//!
//! cache.insert(Tier::Main, "key", ByteView::from("value"));
//! assert_eq!(cache.get(Tier::Main, "key").unwrap().as_ref(), b"value");
//! ```
//!
//! Eviction is lazy: there is no sweeper thread. Expired entries are
//! removed when a lookup touches them or when an insert needs to free
//! space.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod byteview;
mod lru;
mod tiered;

pub use byteview::ByteView;
pub use lru::{EvictCallback, LruStore, StoreConfig};
pub use tiered::{Tier, TieredCache};

use std::time::Duration;

/// Default entry TTL when the caller does not configure one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default expiry jitter window.
///
/// Every insert extends the entry's TTL by a uniform random number of whole
/// seconds below this window, de-synchronizing the expiry of batch-loaded
/// keys.
pub const DEFAULT_JITTER_WINDOW: Duration = Duration::from_secs(60);
