//! Distributed cache groups.
//!
//! An embercache node holds named cache namespaces ("groups"). Each group
//! fronts a slow data source with a bounded two-tier local store, collapses
//! concurrent misses for a key into one load, shards the key space across
//! peers via consistent hashing, and promotes keys with sustained remote
//! demand into a local hot tier.
//!
//! # Read path
//!
//! ```text
//! Group::get -> hot tier -> main tier -> single flight
//!                                          |-> owning peer (remote key)
//!                                          '-> local loader (owned key)
//! ```
//!
//! A value loaded locally lands in the main tier. A value fetched from a
//! peer is returned without caching; only when its remote fetch rate
//! crosses [`HOT_QPS_THRESHOLD`] per minute is it promoted into the hot
//! tier (sized at 1/[`HOT_RATIO`] of the main tier), cutting cross-node
//! traffic for skewed keys.
//!
//! # Example
//!
//! ```
//! use embercache::{new_group, BoxError};
//!
//! let group = new_group("scores", 2 << 10, |key: &str| -> Result<Vec<u8>, BoxError> {
//!     match key {
//!         "Tom" => Ok(b"630".to_vec()),
//!         _ => Err(format!("{key} not exist").into()),
//!     }
//! });
//!
//! assert_eq!(group.get("Tom").unwrap().as_ref(), b"630");
//! assert!(group.get("Nobody").is_err());
//! ```
//!
//! Transports implement [`PeerPicker`]/[`PeerGetter`] (usually by wrapping
//! [`RingPicker`]) and wire them in with
//! [`Group::register_peers`]. The core knows nothing about the wire.

mod error;
mod group;
mod loader;
pub mod metrics;
mod peer;
mod registry;

pub use cache_store::ByteView;
pub use error::{BoxError, ConfigError, GroupError};
pub use group::{Group, GroupBuilder};
pub use loader::Getter;
pub use peer::{PeerGetter, PeerPicker, RingPicker};
pub use registry::{get_group, new_group, register_group};

/// Main-to-hot tier capacity ratio.
pub const HOT_RATIO: usize = 8;

/// Remote fetches per minute at which a key is promoted to the hot tier.
pub const HOT_QPS_THRESHOLD: i64 = 10;
