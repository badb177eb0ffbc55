//! Cache group metrics.

use metriken::{metric, Counter};

#[metric(name = "cache_hot_hits", description = "Lookups served from the hot tier")]
pub static HOT_HITS: Counter = Counter::new();

#[metric(name = "cache_main_hits", description = "Lookups served from the main tier")]
pub static MAIN_HITS: Counter = Counter::new();

#[metric(
    name = "cache_misses",
    description = "Lookups that missed both tiers and entered the load path"
)]
pub static MISSES: Counter = Counter::new();

#[metric(name = "cache_local_loads", description = "Values fetched from the local loader")]
pub static LOCAL_LOADS: Counter = Counter::new();

#[metric(name = "cache_peer_loads", description = "Values fetched from a remote peer")]
pub static PEER_LOADS: Counter = Counter::new();

#[metric(
    name = "cache_peer_errors",
    description = "Peer fetches that failed and fell back to the local loader"
)]
pub static PEER_ERRORS: Counter = Counter::new();

#[metric(
    name = "cache_hot_promotions",
    description = "Remote keys promoted into the hot tier"
)]
pub static HOT_PROMOTIONS: Counter = Counter::new();
