//! Consistent-hash ring with virtual nodes.
//!
//! Maps keys to node identities on a 32-bit circular key space. Each node
//! occupies `replicas` positions on the ring (virtual nodes), which smooths
//! the balance; a key belongs to the node at the first ring position at or
//! after the key's hash, wrapping around at the top.
//!
//! For a fixed node set and replica factor, placement is a pure function of
//! the key and the hash function: every node of a deployment computes the
//! same owner for the same key with no coordination, and membership changes
//! only move the keys adjacent to the affected positions.
//!
//! # Example
//!
//! ```
//! use hashring::HashRing;
//!
//! let mut ring = HashRing::new(50);
//! ring.add(["cache-a:8001", "cache-b:8002", "cache-c:8003"]);
//!
//! let owner = ring.get("some-key").unwrap();
//! assert_eq!(ring.get("some-key").unwrap(), owner);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use ahash::AHashMap;

/// Hash function mapping bytes onto the 32-bit ring.
///
/// Must be stable across every node of a deployment; the default is
/// CRC32-IEEE.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Replica factor used when callers have no specific requirement.
pub const DEFAULT_REPLICAS: usize = 50;

/// A consistent-hash ring assigning keys to node identity strings.
pub struct HashRing {
    replicas: usize,
    hash: HashFn,
    /// Sorted virtual-node positions.
    positions: Vec<u32>,
    /// Position -> owning node identity.
    nodes: AHashMap<u32, String>,
}

impl HashRing {
    /// Create an empty ring with `replicas` virtual nodes per node and the
    /// default CRC32-IEEE hash.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, Box::new(crc32fast::hash))
    }

    /// Create an empty ring with a caller-supplied hash function.
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            replicas,
            hash,
            positions: Vec::new(),
            nodes: AHashMap::new(),
        }
    }

    /// Add nodes to the ring.
    ///
    /// Each node is hashed at `replicas` positions derived from the textual
    /// concatenation of the replica index and the node identity. In the
    /// rare case two virtual nodes collide on a position, the
    /// later-inserted node wins that single position; this only shifts one
    /// virtual node's worth of keys.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for node in nodes {
            let node = node.into();
            for replica in 0..self.replicas {
                let position = (self.hash)(format!("{replica}{node}").as_bytes());
                self.positions.push(position);
                self.nodes.insert(position, node.clone());
            }
        }
        self.positions.sort_unstable();
    }

    /// The node owning `key`, or `None` when the ring is empty.
    ///
    /// Finds the first ring position at or after `hash(key)`, wrapping to
    /// the first position when the hash lands past the last one.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let target = (self.hash)(key.as_bytes());
        let idx = self.positions.partition_point(|&p| p < target);
        let position = self.positions[idx % self.positions.len()];
        self.nodes.get(&position).map(String::as_str)
    }

    /// Whether the ring has no nodes.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of virtual-node positions on the ring.
    pub fn len(&self) -> usize {
        self.positions.len()
    }
}
