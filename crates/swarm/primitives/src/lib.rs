//! Core primitive types for the Swarm local store.
//!
//! This crate provides the chunk and address types shared by the storage
//! crates, kept separate to avoid circular dependencies.
//!
//! # Types
//!
//! - [`ChunkAddress`] - Address of a chunk (32-byte content digest)
//! - [`Chunk`] - Address plus payload, as handed to the local store
//! - [`proximity`] - Proximity order between two addresses

use std::fmt;
use std::str::FromStr;

use alloy_primitives::B256;
use bytes::Bytes;

mod proximity;
pub use proximity::proximity;

/// Size of a chunk address in bytes.
pub const ADDRESS_SIZE: usize = 32;

/// Maximum proximity order.
pub const MAX_PO: u8 = 31;

/// Error returned when bytes do not form a chunk address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Wrong number of bytes.
    #[error("address must be exactly {ADDRESS_SIZE} bytes, got {0}")]
    Length(usize),
    /// Not a hex string.
    #[error("invalid hex address: {0}")]
    Hex(String),
}

/// A 256 bit address of a chunk, or of the node that stores it.
///
/// Addresses compare and sort as big-endian byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkAddress(B256);

impl ChunkAddress {
    /// The all-zero address.
    pub const ZERO: Self = Self(B256::ZERO);

    /// Creates a new address from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(B256::new(bytes))
    }

    /// Creates a new address from a slice, checking the length.
    pub fn from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        <[u8; ADDRESS_SIZE]>::try_from(slice)
            .map(Self::new)
            .map_err(|_| AddressError::Length(slice.len()))
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0.0
    }

    /// Returns the underlying byte array.
    pub const fn into_array(self) -> [u8; ADDRESS_SIZE] {
        self.0.0
    }

    /// Proximity order of `other` relative to this address.
    pub fn proximity(&self, other: &Self) -> u8 {
        proximity(self.as_bytes(), other.as_bytes())
    }
}

impl From<B256> for ChunkAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<ChunkAddress> for B256 {
    fn from(value: ChunkAddress) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for ChunkAddress {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Display for ChunkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&alloy_primitives::hex::encode(self.0))
    }
}

impl FromStr for ChunkAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = alloy_primitives::hex::decode(s).map_err(|e| AddressError::Hex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

/// A content-addressed unit of data.
///
/// The store treats chunks as already validated: the address is taken as
/// given and never re-derived from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    address: ChunkAddress,
    data: Bytes,
}

impl Chunk {
    /// Creates a chunk from its address and payload.
    pub fn new(address: ChunkAddress, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            data: data.into(),
        }
    }

    /// The chunk address.
    pub fn address(&self) -> &ChunkAddress {
        &self.address
    }

    /// The chunk payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}
