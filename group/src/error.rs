//! Error types for group operations.

use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by user-supplied loaders and peer clients.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors surfaced by [`Group::get`](crate::Group::get).
///
/// `Clone` so that every caller coalesced onto one in-flight load can
/// receive the same failure; sources are therefore held behind `Arc`.
#[derive(Debug, Clone, Error)]
pub enum GroupError {
    /// The caller passed an empty key.
    #[error("key is required")]
    EmptyKey,

    /// The group's loader failed; surfaced to the caller.
    #[error("loading {key:?} from source failed: {source}")]
    Load {
        /// The key being loaded.
        key: String,
        /// The loader's error.
        source: Arc<dyn Error + Send + Sync + 'static>,
    },

    /// A peer fetch failed. Logged by the load pipeline and followed by a
    /// local-load fallback, so this only reaches callers of
    /// [`Group::get_from_peer`]-style entry points a transport might add.
    #[error("fetching {key:?} from peer failed: {source}")]
    Peer {
        /// The key being fetched.
        key: String,
        /// The peer transport's error.
        source: Arc<dyn Error + Send + Sync + 'static>,
    },
}

impl GroupError {
    pub(crate) fn load(key: &str, source: BoxError) -> Self {
        Self::Load {
            key: key.to_owned(),
            source: Arc::from(source),
        }
    }

    pub(crate) fn peer(key: &str, source: BoxError) -> Self {
        Self::Peer {
            key: key.to_owned(),
            source: Arc::from(source),
        }
    }
}

/// Errors from [`GroupBuilder::build`](crate::GroupBuilder::build).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The hot-tier ratio must be at least 1.
    #[error("hot ratio must be non-zero")]
    ZeroHotRatio,

    /// The promotion threshold must be at least 1.
    #[error("hot QPS threshold must be non-zero")]
    ZeroQpsThreshold,
}
