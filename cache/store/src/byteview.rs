//! Immutable value bytes.

use bytes::Bytes;
use std::fmt;
use std::ops::Deref;

/// An immutable view of a cached value.
///
/// All values flowing through the cache are `ByteView`s. Cloning is cheap
/// (reference counted), and the bytes behind a view can never change, so a
/// view handed to a caller stays valid regardless of what the cache does
/// with the entry afterwards.
///
/// Use [`ByteView::copy_from`] at trust boundaries (e.g. bytes returned by a
/// user-supplied loader) so callers holding the original buffer cannot
/// mutate what the cache stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    bytes: Bytes,
}

impl ByteView {
    /// Create a view that owns a defensive copy of `data`.
    pub fn copy_from(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    /// Length of the value in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the value is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The value as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy the value into a fresh `Vec<u8>`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        Self {
            bytes: Bytes::from(data),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(data: &[u8]) -> Self {
        Self::copy_from(data)
    }
}

impl From<&str> for ByteView {
    fn from(data: &str) -> Self {
        Self::copy_from(data.as_bytes())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Deref for ByteView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}
