//! Test utilities for vertex-swarm crates.
//!
//! Generators for random chunks and addresses. Chunk addresses are the
//! keccak256 digest of the payload, so every generated chunk is content
//! addressed even though the store never checks it.

use alloy_primitives::keccak256;
use rand::Rng;
use vertex_swarm_primitives::{ADDRESS_SIZE, Chunk, ChunkAddress};

/// Default payload size of generated chunks.
pub const CHUNK_SIZE: usize = 4096;

/// A uniformly random address.
pub fn random_address() -> ChunkAddress {
    ChunkAddress::new(rand::rng().random::<[u8; ADDRESS_SIZE]>())
}

/// A random chunk with a [`CHUNK_SIZE`] payload.
pub fn random_chunk() -> Chunk {
    random_chunk_with_size(CHUNK_SIZE)
}

/// A random chunk with a payload of `size` bytes.
pub fn random_chunk_with_size(size: usize) -> Chunk {
    let mut data = vec![0u8; size];
    rand::rng().fill(data.as_mut_slice());
    let address = ChunkAddress::from(keccak256(&data));
    Chunk::new(address, data)
}

/// `count` random chunks.
pub fn random_chunks(count: usize) -> Vec<Chunk> {
    (0..count).map(|_| random_chunk()).collect()
}

/// An address whose proximity order to `base` is exactly `po`.
///
/// `po` must be below [`vertex_swarm_primitives::MAX_PO`].
pub fn address_at_po(base: &ChunkAddress, po: u8) -> ChunkAddress {
    let mut bytes = random_address().into_array();
    let base = base.as_bytes();
    let byte = usize::from(po / 8);
    let bit = po % 8;

    bytes[..byte].copy_from_slice(&base[..byte]);
    // keep the leading `bit` bits of the base, flip the next one
    let keep = 0xffu8.checked_shl(u32::from(8 - bit)).unwrap_or(0);
    let flip = 0x80u8 >> bit;
    bytes[byte] = (base[byte] & keep) | (!base[byte] & flip) | (bytes[byte] & !(keep | flip));

    ChunkAddress::new(bytes)
}
