//! Storage abstractions for Vertex.
//!
//! Everything the local store persists lives in a single ordered key space.
//! A [`Table`] claims a one-byte prefix of that space and fixes how its keys
//! and values are serialized. A [`KvStore`] backend provides point lookups,
//! ordered iteration and atomic application of a [`Batch`], and runs
//! read-then-write [`Transaction`]s that commit as one batch.
//!
//! Key encodings must be order preserving: the byte order of encoded keys is
//! the iteration order consumers observe.

use std::fmt::Debug;

mod batch;
mod codec;
mod memory;
mod store;

pub use batch::{Batch, Transaction};
pub use codec::{FieldReader, decode_timestamp, encode_timestamp};
pub use memory::MemoryStore;
pub use store::{KvRead, KvReadExt, KvStore};

/// Trait that will transform the data to be saved in the DB.
pub trait Compress: Send + Sync + Sized + Debug {
    /// Compresses data to a given buffer.
    fn compress_to_buf<B: bytes::BufMut>(&self, buf: &mut B);

    /// Compresses data going into the database.
    fn compress(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.compress_to_buf(&mut buf);
        buf
    }
}

/// Trait that will transform the data to be read from the DB.
pub trait Decompress: Send + Sync + Sized + Debug {
    /// Decompresses data coming from the database.
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError>;
}

/// Trait that will transform a key to be saved in the DB.
///
/// The encoded form of two keys must compare the same way the keys do.
pub trait Encode: Send + Sync + Sized + Debug {
    /// Encoded type.
    type Encoded: AsRef<[u8]> + Into<Vec<u8>> + Send + Sync + Ord + Debug;

    /// Encodes data going into the database.
    fn encode(self) -> Self::Encoded;
}

/// Trait that will transform a key read from the DB.
pub trait Decode: Send + Sync + Sized + Debug {
    /// Decodes data coming from the database.
    fn decode(value: &[u8]) -> Result<Self, DatabaseError>;
}

/// Generic trait that enforces the database key to implement [`Encode`] and [`Decode`].
pub trait Key: Encode + Decode + Ord + Clone {}

impl<T> Key for T where T: Encode + Decode + Ord + Clone {}

/// Generic trait that enforces the database value to implement [`Compress`] and [`Decompress`].
pub trait Value: Compress + Decompress {}

impl<T> Value for T where T: Compress + Decompress {}

/// A named region of the key space.
pub trait Table: Send + Sync + Debug + 'static {
    /// Human readable table name, used in logs, metrics and errors.
    const NAME: &'static str;

    /// Key prefix separating this table from all others.
    const PREFIX: u8;

    /// Key type.
    type Key: Key;

    /// Value type.
    type Value: Value;
}

/// Full key of `key` in table `T`: the table prefix followed by the encoded key.
pub fn table_key<T: Table>(key: T::Key) -> Vec<u8> {
    let encoded = key.encode();
    let encoded = encoded.as_ref();
    let mut buf = Vec::with_capacity(encoded.len() + 1);
    buf.push(T::PREFIX);
    buf.extend_from_slice(encoded);
    buf
}

/// Database error type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to decode a key or value from a table.
    #[error("failed to decode a {0} entry")]
    Decode(&'static str),
    /// The storage backend failed.
    #[error("storage backend: {0}")]
    Backend(String),
    /// Other unspecified error.
    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    /// Wrap any backend error.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counters;

    impl Table for Counters {
        const NAME: &'static str = "counters";
        const PREFIX: u8 = 0x09;
        type Key = u64;
        type Value = u64;
    }

    #[test]
    fn test_table_key_is_prefixed() {
        let key = table_key::<Counters>(0x0102);
        assert_eq!(key, vec![0x09, 0, 0, 0, 0, 0, 0, 0x01, 0x02]);
    }
}
