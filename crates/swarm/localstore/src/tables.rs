//! Index tables and their on-disk encodings.
//!
//! Every table lives in the same ordered key space under its own one-byte
//! prefix. Multi-field keys are concatenations of fixed-width fields:
//! proximity order as one byte, timestamps as 8-byte order-preserving
//! big-endian ([`encode_timestamp`]), addresses as their raw 32 bytes. Byte
//! order of an encoded key is therefore the field-by-field order of the key
//! struct, which the derived `Ord` impls mirror.
//!
//! These encodings are the persisted contract of the store and must stay bit
//! stable.

use bytes::{BufMut, Bytes};
use vertex_storage::{
    Compress, DatabaseError, Decode, Decompress, Encode, FieldReader, Table, encode_timestamp,
};
use vertex_swarm_primitives::{ADDRESS_SIZE, ChunkAddress, proximity};

use crate::IndexItem;

/// Maps between [`IndexItem`]s and the typed entries of a table.
pub trait ItemTable: Table {
    /// Key of `item`; `base` is the store's own address.
    fn key(base: &ChunkAddress, item: &IndexItem) -> Self::Key;

    /// Value of `item`.
    fn value(item: &IndexItem) -> Self::Value;

    /// Rebuild the item fields this table persists.
    fn item(key: Self::Key, value: Self::Value) -> IndexItem;
}

fn read_address(reader: &mut FieldReader<'_>) -> Result<ChunkAddress, DatabaseError> {
    reader.array::<ADDRESS_SIZE>().map(ChunkAddress::new)
}

macro_rules! table {
    ($(#[$docs:meta])* $name:ident, $table_name:literal, $prefix:literal, $key:ty => $value:ty) => {
        $(#[$docs])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Table for $name {
            const NAME: &'static str = $table_name;
            const PREFIX: u8 = $prefix;
            type Key = $key;
            type Value = $value;
        }
    };
}

table!(
    /// Store-wide scalars: size counter and layout marker.
    Meta, "meta", 0x00, MetaKey => u64
);
table!(
    /// Composite retrieval layout: payload and both timestamps in one record.
    Retrieval, "retrieval", 0x01, AddressKey => RetrievalValue
);
table!(
    /// Split retrieval layout, payload half.
    RetrievalData, "retrieval_data", 0x02, AddressKey => DataValue
);
table!(
    /// Split retrieval layout, access time half.
    RetrievalAccess, "retrieval_access", 0x03, AddressKey => AccessValue
);
table!(
    /// Chunks ordered for pull sync: nearest bins first, then by store time.
    Pull, "pull", 0x04, PullKey => ()
);
table!(
    /// Locally created chunks awaiting confirmation that they were pushed.
    Push, "push", 0x05, PushKey => ()
);
table!(
    /// Chunks ordered least recently accessed first, for eviction.
    Gc, "gc", 0x06, GcKey => ()
);
table!(
    /// The base address the store was created with.
    Base, "base", 0x07, () => AddressValue
);

/// Keys of the [`Meta`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetaKey {
    /// Number of counted chunks.
    Size,
    /// Retrieval layout chosen when the store was created.
    Layout,
}

impl MetaKey {
    const fn field(self) -> &'static [u8] {
        match self {
            Self::Size => b"size",
            Self::Layout => b"layout",
        }
    }
}

impl Encode for MetaKey {
    type Encoded = &'static [u8];

    fn encode(self) -> Self::Encoded {
        self.field()
    }
}

impl Decode for MetaKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        [Self::Size, Self::Layout]
            .into_iter()
            .find(|key| key.field() == value)
            .ok_or(DatabaseError::Decode(Meta::NAME))
    }
}

/// Key of tables indexed by chunk address alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AddressKey(pub ChunkAddress);

impl Encode for AddressKey {
    type Encoded = [u8; ADDRESS_SIZE];

    fn encode(self) -> Self::Encoded {
        self.0.into_array()
    }
}

impl Decode for AddressKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, "address key");
        let address = read_address(&mut reader)?;
        reader.finish()?;
        Ok(Self(address))
    }
}

/// `po | store_timestamp | address`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PullKey {
    /// Proximity order of the address to the store's base address.
    pub po: u8,
    /// Store time of the chunk.
    pub store_timestamp: i64,
    /// Chunk address.
    pub address: ChunkAddress,
}

impl Encode for PullKey {
    type Encoded = Vec<u8>;

    fn encode(self) -> Self::Encoded {
        let mut buf = Vec::with_capacity(1 + 8 + ADDRESS_SIZE);
        buf.put_u8(self.po);
        buf.put_slice(&encode_timestamp(self.store_timestamp));
        buf.put_slice(self.address.as_bytes());
        buf
    }
}

impl Decode for PullKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, Pull::NAME);
        let key = Self {
            po: reader.u8()?,
            store_timestamp: reader.timestamp()?,
            address: read_address(&mut reader)?,
        };
        reader.finish()?;
        Ok(key)
    }
}

/// `store_timestamp | address`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PushKey {
    /// Store time of the chunk.
    pub store_timestamp: i64,
    /// Chunk address.
    pub address: ChunkAddress,
}

impl Encode for PushKey {
    type Encoded = Vec<u8>;

    fn encode(self) -> Self::Encoded {
        let mut buf = Vec::with_capacity(8 + ADDRESS_SIZE);
        buf.put_slice(&encode_timestamp(self.store_timestamp));
        buf.put_slice(self.address.as_bytes());
        buf
    }
}

impl Decode for PushKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, Push::NAME);
        let key = Self {
            store_timestamp: reader.timestamp()?,
            address: read_address(&mut reader)?,
        };
        reader.finish()?;
        Ok(key)
    }
}

/// `access_timestamp | store_timestamp | address`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GcKey {
    /// Last access time of the chunk.
    pub access_timestamp: i64,
    /// Store time of the chunk.
    pub store_timestamp: i64,
    /// Chunk address.
    pub address: ChunkAddress,
}

impl Encode for GcKey {
    type Encoded = Vec<u8>;

    fn encode(self) -> Self::Encoded {
        let mut buf = Vec::with_capacity(8 + 8 + ADDRESS_SIZE);
        buf.put_slice(&encode_timestamp(self.access_timestamp));
        buf.put_slice(&encode_timestamp(self.store_timestamp));
        buf.put_slice(self.address.as_bytes());
        buf
    }
}

impl Decode for GcKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, Gc::NAME);
        let key = Self {
            access_timestamp: reader.timestamp()?,
            store_timestamp: reader.timestamp()?,
            address: read_address(&mut reader)?,
        };
        reader.finish()?;
        Ok(key)
    }
}

/// `store_timestamp | access_timestamp | data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalValue {
    /// Store time of the chunk.
    pub store_timestamp: i64,
    /// Last access time of the chunk, zero if never accessed.
    pub access_timestamp: i64,
    /// Chunk payload.
    pub data: Bytes,
}

impl Compress for RetrievalValue {
    fn compress_to_buf<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&encode_timestamp(self.store_timestamp));
        buf.put_slice(&encode_timestamp(self.access_timestamp));
        buf.put_slice(&self.data);
    }
}

impl Decompress for RetrievalValue {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, Retrieval::NAME);
        Ok(Self {
            store_timestamp: reader.timestamp()?,
            access_timestamp: reader.timestamp()?,
            data: Bytes::copy_from_slice(reader.rest()),
        })
    }
}

/// `store_timestamp | data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataValue {
    /// Store time of the chunk.
    pub store_timestamp: i64,
    /// Chunk payload.
    pub data: Bytes,
}

impl Compress for DataValue {
    fn compress_to_buf<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&encode_timestamp(self.store_timestamp));
        buf.put_slice(&self.data);
    }
}

impl Decompress for DataValue {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, RetrievalData::NAME);
        Ok(Self {
            store_timestamp: reader.timestamp()?,
            data: Bytes::copy_from_slice(reader.rest()),
        })
    }
}

/// `access_timestamp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessValue {
    /// Last access time of the chunk.
    pub access_timestamp: i64,
}

impl Compress for AccessValue {
    fn compress_to_buf<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&encode_timestamp(self.access_timestamp));
    }
}

impl Decompress for AccessValue {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, RetrievalAccess::NAME);
        let access_timestamp = reader.timestamp()?;
        reader.finish()?;
        Ok(Self { access_timestamp })
    }
}

/// A persisted address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressValue(pub ChunkAddress);

impl Compress for AddressValue {
    fn compress_to_buf<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(self.0.as_bytes());
    }
}

impl Decompress for AddressValue {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, Base::NAME);
        let address = read_address(&mut reader)?;
        reader.finish()?;
        Ok(Self(address))
    }
}

impl ItemTable for Retrieval {
    fn key(_base: &ChunkAddress, item: &IndexItem) -> Self::Key {
        AddressKey(item.address)
    }

    fn value(item: &IndexItem) -> Self::Value {
        RetrievalValue {
            store_timestamp: item.store_timestamp,
            access_timestamp: item.access_timestamp,
            data: item.data.clone().unwrap_or_default(),
        }
    }

    fn item(key: Self::Key, value: Self::Value) -> IndexItem {
        IndexItem {
            address: key.0,
            data: Some(value.data),
            store_timestamp: value.store_timestamp,
            access_timestamp: value.access_timestamp,
        }
    }
}

impl ItemTable for RetrievalData {
    fn key(_base: &ChunkAddress, item: &IndexItem) -> Self::Key {
        AddressKey(item.address)
    }

    fn value(item: &IndexItem) -> Self::Value {
        DataValue {
            store_timestamp: item.store_timestamp,
            data: item.data.clone().unwrap_or_default(),
        }
    }

    fn item(key: Self::Key, value: Self::Value) -> IndexItem {
        IndexItem {
            address: key.0,
            data: Some(value.data),
            store_timestamp: value.store_timestamp,
            access_timestamp: 0,
        }
    }
}

impl ItemTable for RetrievalAccess {
    fn key(_base: &ChunkAddress, item: &IndexItem) -> Self::Key {
        AddressKey(item.address)
    }

    fn value(item: &IndexItem) -> Self::Value {
        AccessValue {
            access_timestamp: item.access_timestamp,
        }
    }

    fn item(key: Self::Key, value: Self::Value) -> IndexItem {
        IndexItem::from_address(key.0).with_access_timestamp(value.access_timestamp)
    }
}

impl ItemTable for Pull {
    fn key(base: &ChunkAddress, item: &IndexItem) -> Self::Key {
        PullKey {
            po: proximity(base.as_bytes(), item.address.as_bytes()),
            store_timestamp: item.store_timestamp,
            address: item.address,
        }
    }

    fn value(_item: &IndexItem) -> Self::Value {}

    fn item(key: Self::Key, (): Self::Value) -> IndexItem {
        IndexItem::from_address(key.address).with_store_timestamp(key.store_timestamp)
    }
}

impl ItemTable for Push {
    fn key(_base: &ChunkAddress, item: &IndexItem) -> Self::Key {
        PushKey {
            store_timestamp: item.store_timestamp,
            address: item.address,
        }
    }

    fn value(_item: &IndexItem) -> Self::Value {}

    fn item(key: Self::Key, (): Self::Value) -> IndexItem {
        IndexItem::from_address(key.address).with_store_timestamp(key.store_timestamp)
    }
}

impl ItemTable for Gc {
    fn key(_base: &ChunkAddress, item: &IndexItem) -> Self::Key {
        GcKey {
            access_timestamp: item.access_timestamp,
            store_timestamp: item.store_timestamp,
            address: item.address,
        }
    }

    fn value(_item: &IndexItem) -> Self::Value {}

    fn item(key: Self::Key, (): Self::Value) -> IndexItem {
        IndexItem::from_address(key.address)
            .with_store_timestamp(key.store_timestamp)
            .with_access_timestamp(key.access_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn address(seed: u8) -> ChunkAddress {
        ChunkAddress::new([seed; ADDRESS_SIZE])
    }

    #[test]
    fn test_pull_key_layout() {
        let key = PullKey {
            po: 3,
            store_timestamp: 1,
            address: address(0xaa),
        };
        let encoded = key.encode();

        assert_eq!(encoded.len(), 41);
        assert_eq!(encoded[0], 3);
        assert_eq!(encoded[1..9], [0x80, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(encoded[9..], [0xaa; ADDRESS_SIZE]);
        assert_eq!(PullKey::decode(&encoded).unwrap(), key);
    }

    #[test]
    fn test_gc_key_sorts_by_access_first() {
        let older_access = GcKey {
            access_timestamp: 10,
            store_timestamp: 900,
            address: address(0xff),
        };
        let newer_access = GcKey {
            access_timestamp: 11,
            store_timestamp: 1,
            address: address(0x00),
        };
        assert!(older_access.encode() < newer_access.encode());
    }

    #[test]
    fn test_negative_timestamps_sort_first() {
        let before_epoch = PushKey {
            store_timestamp: -5,
            address: address(0xff),
        };
        let after_epoch = PushKey {
            store_timestamp: 5,
            address: address(0x00),
        };
        assert!(before_epoch.encode() < after_epoch.encode());
    }

    #[test]
    fn test_retrieval_value_layout() {
        let value = RetrievalValue {
            store_timestamp: 7,
            access_timestamp: 9,
            data: Bytes::from_static(b"payload"),
        };
        let compressed = value.compress();

        assert_eq!(compressed.len(), 16 + 7);
        assert_eq!(compressed[16..], *b"payload");
        assert_eq!(RetrievalValue::decompress(&compressed).unwrap(), value);
    }

    #[test]
    fn test_truncated_keys_are_rejected() {
        let encoded = GcKey {
            access_timestamp: 1,
            store_timestamp: 2,
            address: address(1),
        }
        .encode();

        assert_eq!(GcKey::decode(&encoded[..40]), Err(DatabaseError::Decode("gc")));
        assert!(AddressKey::decode(&[0; 33]).is_err());
        assert!(MetaKey::decode(b"sizes").is_err());
    }

    fn arb_address() -> impl Strategy<Value = ChunkAddress> {
        any::<[u8; ADDRESS_SIZE]>().prop_map(ChunkAddress::new)
    }

    fn arb_pull_key() -> impl Strategy<Value = PullKey> {
        (0u8..=31, any::<i64>(), arb_address()).prop_map(|(po, store_timestamp, address)| {
            PullKey {
                po,
                store_timestamp,
                address,
            }
        })
    }

    fn arb_gc_key() -> impl Strategy<Value = GcKey> {
        (any::<i64>(), any::<i64>(), arb_address()).prop_map(
            |(access_timestamp, store_timestamp, address)| GcKey {
                access_timestamp,
                store_timestamp,
                address,
            },
        )
    }

    proptest! {
        #[test]
        fn pull_key_bytes_sort_like_fields(a in arb_pull_key(), b in arb_pull_key()) {
            prop_assert_eq!(a.cmp(&b), a.encode().cmp(&b.encode()));
        }

        #[test]
        fn gc_key_bytes_sort_like_fields(a in arb_gc_key(), b in arb_gc_key()) {
            prop_assert_eq!(a.cmp(&b), a.encode().cmp(&b.encode()));
        }

        #[test]
        fn push_key_bytes_sort_like_fields(
            (ta, aa) in (any::<i64>(), arb_address()),
            (tb, ab) in (any::<i64>(), arb_address()),
        ) {
            let a = PushKey { store_timestamp: ta, address: aa };
            let b = PushKey { store_timestamp: tb, address: ab };
            prop_assert_eq!(a.cmp(&b), a.encode().cmp(&b.encode()));
        }
    }
}
