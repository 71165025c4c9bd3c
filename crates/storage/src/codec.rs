//! Fixed-width encodings shared by table keys and values.

use crate::{Compress, DatabaseError, Decode, Decompress, Encode};

const SIGN_BIT: u64 = 1 << 63;

/// Encodes a signed timestamp so that byte order equals numeric order.
///
/// Big-endian with the sign bit flipped: `i64::MIN` encodes to all zeroes,
/// `-1` sorts directly before `0`.
pub const fn encode_timestamp(value: i64) -> [u8; 8] {
    ((value as u64) ^ SIGN_BIT).to_be_bytes()
}

/// Inverse of [`encode_timestamp`].
pub const fn decode_timestamp(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_BIT) as i64
}

/// Reads fixed-width fields off the front of an encoded key or value.
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    what: &'static str,
}

impl<'a> FieldReader<'a> {
    /// Start reading `buf`; `what` names the table in decode errors.
    pub const fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, what }
    }

    /// Take the next `N` bytes.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], DatabaseError> {
        let (head, rest) = self
            .buf
            .split_first_chunk::<N>()
            .ok_or(DatabaseError::Decode(self.what))?;
        self.buf = rest;
        Ok(*head)
    }

    /// Take the next byte.
    pub fn u8(&mut self) -> Result<u8, DatabaseError> {
        let [byte] = self.array::<1>()?;
        Ok(byte)
    }

    /// Take the next order-preserving timestamp.
    pub fn timestamp(&mut self) -> Result<i64, DatabaseError> {
        self.array::<8>().map(decode_timestamp)
    }

    /// Take everything that is left.
    pub fn rest(self) -> &'a [u8] {
        self.buf
    }

    /// Fail unless every byte was consumed.
    pub fn finish(self) -> Result<(), DatabaseError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(DatabaseError::Decode(self.what))
        }
    }
}

impl Encode for u64 {
    type Encoded = [u8; 8];

    fn encode(self) -> Self::Encoded {
        self.to_be_bytes()
    }
}

impl Decode for u64 {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        let mut reader = FieldReader::new(value, "u64");
        let bytes = reader.array::<8>()?;
        reader.finish()?;
        Ok(u64::from_be_bytes(bytes))
    }
}

impl Compress for u64 {
    fn compress_to_buf<B: bytes::BufMut>(&self, buf: &mut B) {
        buf.put_u64(*self);
    }
}

impl Decompress for u64 {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        <u64 as Decode>::decode(value)
    }
}

impl Encode for () {
    type Encoded = [u8; 0];

    fn encode(self) -> Self::Encoded {
        []
    }
}

impl Decode for () {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        FieldReader::new(value, "unit").finish()
    }
}

impl Compress for () {
    fn compress_to_buf<B: bytes::BufMut>(&self, _buf: &mut B) {}
}

impl Decompress for () {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        <() as Decode>::decode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_timestamp_boundaries() {
        assert_eq!(encode_timestamp(i64::MIN), [0; 8]);
        assert_eq!(encode_timestamp(i64::MAX), [0xff; 8]);
        assert_eq!(encode_timestamp(0), [0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert!(encode_timestamp(-1) < encode_timestamp(0));
    }

    #[test]
    fn test_field_reader_rejects_short_input() {
        let mut reader = FieldReader::new(&[1, 2, 3], "short");
        assert_eq!(reader.timestamp(), Err(DatabaseError::Decode("short")));
    }

    #[test]
    fn test_field_reader_rejects_trailing_bytes() {
        let mut reader = FieldReader::new(&[7, 8], "trailing");
        assert_eq!(reader.u8(), Ok(7));
        assert!(reader.finish().is_err());
    }

    proptest! {
        #[test]
        fn timestamp_encoding_preserves_order(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(a.cmp(&b), encode_timestamp(a).cmp(&encode_timestamp(b)));
            prop_assert_eq!(decode_timestamp(encode_timestamp(a)), a);
        }
    }
}
