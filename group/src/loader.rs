//! The loader seam between a group and its slow data source.

use crate::error::BoxError;

/// Loads authoritative data for a key.
///
/// Supplied by the application when a group is created; called on a cache
/// miss, at most once per key per in-flight load window (concurrent misses
/// for one key are coalesced). Returning an error propagates out of
/// [`Group::get`](crate::Group::get).
pub trait Getter: Send + Sync {
    /// Fetch the value for `key` from the backing source.
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError>;
}

/// Any `Fn(&str) -> Result<Vec<u8>, BoxError>` closure is a loader.
impl<F> Getter for F
where
    F: Fn(&str) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        self(key)
    }
}
