//! Peer abstraction.
//!
//! The group talks to remote nodes exclusively through these two traits;
//! any transport (HTTP, RPC, an in-memory double in tests) can stand behind
//! them.

use crate::error::BoxError;
use ahash::AHashMap;
use hashring::HashRing;
use std::sync::Arc;

/// Locates the peer that owns a key.
///
/// Returning `None` means "no peer should serve this key", because the
/// local node is the owner or no peers are registered, and routes the load
/// to the local loader. Implementations typically wrap a
/// [`hashring::HashRing`] over the deployment's node identities.
pub trait PeerPicker: Send + Sync {
    /// Pick the owning peer for `key`, or `None` for "load locally".
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// Client side of one remote peer.
pub trait PeerGetter: Send + Sync {
    /// Fetch the authoritative value for `key` in `group` from this peer.
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>, BoxError>;
}

/// Consistent-hash [`PeerPicker`] over a set of peer clients.
///
/// Transports register one client per peer identity; keys the ring assigns
/// to the local node's own identity resolve to `None`, which sends the load
/// to the local loader.
pub struct RingPicker {
    self_id: String,
    ring: HashRing,
    clients: AHashMap<String, Arc<dyn PeerGetter>>,
}

impl RingPicker {
    /// Create a picker for the node identified by `self_id` with
    /// `replicas` virtual nodes per peer on the ring.
    pub fn new(self_id: impl Into<String>, replicas: usize) -> Self {
        Self {
            self_id: self_id.into(),
            ring: HashRing::new(replicas),
            clients: AHashMap::new(),
        }
    }

    /// Place the local node on the ring.
    ///
    /// Keys the ring assigns to it are loaded locally; no client is
    /// needed.
    pub fn add_self(&mut self) {
        let self_id = self.self_id.clone();
        self.ring.add([self_id]);
    }

    /// Place a remote peer on the ring with its client.
    pub fn add_peer(&mut self, id: impl Into<String>, client: Arc<dyn PeerGetter>) {
        let id = id.into();
        self.ring.add([id.clone()]);
        self.clients.insert(id, client);
    }
}

impl PeerPicker for RingPicker {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let owner = self.ring.get(key)?;
        if owner == self.self_id {
            return None;
        }
        self.clients.get(owner).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoPeer(&'static str);

    impl PeerGetter for EchoPeer {
        fn get(&self, _group: &str, key: &str) -> Result<Vec<u8>, BoxError> {
            Ok(format!("{}:{}", self.0, key).into_bytes())
        }
    }

    #[test]
    fn test_empty_ring_picks_nobody() {
        let picker = RingPicker::new("node-a", 50);
        assert!(picker.pick_peer("key").is_none());
    }

    #[test]
    fn test_self_owned_keys_load_locally() {
        let mut picker = RingPicker::new("node-a", 50);
        picker.add_self();
        // Only the local node on the ring: every key is ours.
        for i in 0..100 {
            assert!(picker.pick_peer(&format!("key-{i}")).is_none());
        }
    }

    #[test]
    fn test_keys_spread_across_cluster() {
        let mut picker = RingPicker::new("node-a", 50);
        picker.add_self();
        picker.add_peer("node-b", Arc::new(EchoPeer("node-b")));
        picker.add_peer("node-c", Arc::new(EchoPeer("node-c")));

        let mut local = 0;
        let mut remote = std::collections::HashSet::new();
        for i in 0..300 {
            let key = format!("key-{i}");
            match picker.pick_peer(&key) {
                None => local += 1,
                Some(peer) => {
                    let value = peer.get("g", &key).unwrap();
                    let owner = String::from_utf8(value).unwrap();
                    remote.insert(owner.split(':').next().unwrap().to_owned());
                }
            }
        }
        assert!(local > 0, "some keys must stay local");
        assert_eq!(remote.len(), 2, "both remote peers must own keys");
    }

    #[test]
    fn test_picking_is_stable() {
        let mut picker = RingPicker::new("node-a", 50);
        picker.add_self();
        picker.add_peer("node-b", Arc::new(EchoPeer("node-b")));

        for i in 0..50 {
            let key = format!("key-{i}");
            let first = picker.pick_peer(&key).is_none();
            let second = picker.pick_peer(&key).is_none();
            assert_eq!(first, second);
        }
    }
}
