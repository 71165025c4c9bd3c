use bytes::Bytes;
use vertex_swarm_primitives::{Chunk, ChunkAddress};

/// The record exchanged with every index.
///
/// Each index persists only the fields its key and value schema name;
/// reading an entry back fills those fields and leaves the rest at their
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexItem {
    /// Chunk address, the field correlating all entries of a chunk.
    pub address: ChunkAddress,
    /// Chunk payload, only held by the retrieval indexes.
    pub data: Option<Bytes>,
    /// Nanoseconds at which the chunk was first stored.
    pub store_timestamp: i64,
    /// Nanoseconds of the last access, zero if never accessed.
    pub access_timestamp: i64,
}

impl IndexItem {
    /// An item carrying only an address.
    pub fn from_address(address: ChunkAddress) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// An item carrying a chunk's address and payload.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            address: *chunk.address(),
            data: Some(chunk.data().clone()),
            ..Default::default()
        }
    }

    /// Sets the store timestamp.
    pub fn with_store_timestamp(mut self, timestamp: i64) -> Self {
        self.store_timestamp = timestamp;
        self
    }

    /// Sets the access timestamp.
    pub fn with_access_timestamp(mut self, timestamp: i64) -> Self {
        self.access_timestamp = timestamp;
        self
    }

    /// The chunk this item describes; an item without payload yields an
    /// empty chunk.
    pub fn into_chunk(self) -> Chunk {
        Chunk::new(self.address, self.data.unwrap_or_default())
    }
}
