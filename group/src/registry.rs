//! Process-wide group registry.
//!
//! Groups are looked up far more often than they are created, so the
//! registry sits behind a read/write lock taken for writing only at
//! startup.

use crate::group::Group;
use crate::loader::Getter;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};

static GROUPS: LazyLock<RwLock<AHashMap<String, Arc<Group>>>> =
    LazyLock::new(|| RwLock::new(AHashMap::new()));

/// Create a group with `cache_bytes` of main-tier capacity and register it
/// under `name`.
///
/// Registering a name that already exists replaces the previous group;
/// later [`get_group`] calls resolve to the new one while existing handles
/// to the old group keep working.
///
/// For non-default TTL, jitter, or promotion settings, build the group via
/// [`Group::builder`] and register it with [`register_group`].
pub fn new_group(name: &str, cache_bytes: usize, getter: impl Getter + 'static) -> Arc<Group> {
    let group = Group::builder(name)
        .cache_bytes(cache_bytes)
        .build(getter)
        .expect("default group configuration is valid");
    register_group(group)
}

/// Register an already-built group under its own name, replacing any
/// previous group with that name.
pub fn register_group(group: Group) -> Arc<Group> {
    let group = Arc::new(group);
    GROUPS
        .write()
        .insert(group.name().to_owned(), group.clone());
    group
}

/// Look up a previously registered group.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    GROUPS.read().get(name).cloned()
}
