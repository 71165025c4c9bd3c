use crate::MAX_PO;

/// Proximity order of the MSB distance between `one` and `other`.
///
/// The distance metric MSB(x, y) of two equal length bit sequences x and y is
/// the value of the binary integer cast of x^y, ie., x and y bitwise xor-ed.
/// The binary cast is big endian: most significant bit first (=MSB).
///
/// Proximity(x, y) is a discrete logarithmic scaling of the MSB distance: the
/// number of common leading bits of x and y, capped at [`MAX_PO`].
///
/// (0 farthest, [`MAX_PO`] closest or equal)
pub fn proximity(one: &[u8], other: &[u8]) -> u8 {
    let bytes = usize::from(MAX_PO / 8 + 1)
        .min(one.len())
        .min(other.len());

    for (i, (a, b)) in one.iter().zip(other).take(bytes).enumerate() {
        let oxo = a ^ b;
        if oxo != 0 {
            let po = i * 8 + oxo.leading_zeros() as usize;
            return u8::try_from(po).map_or(MAX_PO, |po| po.min(MAX_PO));
        }
    }
    MAX_PO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ADDRESS_SIZE;

    #[test]
    fn test_proximity() {
        let limit_po = |po: u8| -> u8 { po.min(MAX_PO) };

        let base = [0u8; ADDRESS_SIZE];
        let test_cases: Vec<(Vec<u8>, u8)> = vec![
            (vec![0b00000000, 0b00000000, 0b00000000, 0b00000000], MAX_PO),
            (vec![0b10000000, 0b00000000, 0b00000000, 0b00000000], limit_po(0)),
            (vec![0b01000000, 0b00000000, 0b00000000, 0b00000000], limit_po(1)),
            (vec![0b00100000, 0b00000000, 0b00000000, 0b00000000], limit_po(2)),
            (vec![0b00000001, 0b00000000, 0b00000000, 0b00000000], limit_po(7)),
            (vec![0b00000000, 0b10000000, 0b00000000, 0b00000000], limit_po(8)),
            (vec![0b00000000, 0b00000001, 0b00000000, 0b00000000], limit_po(15)),
            (vec![0b00000000, 0b00000000, 0b10000000, 0b00000000], limit_po(16)),
            (vec![0b00000000, 0b00000000, 0b00000100, 0b00000000], limit_po(21)),
            (vec![0b00000000, 0b00000000, 0b00000000, 0b10000000], limit_po(24)),
            (vec![0b00000000, 0b00000000, 0b00000000, 0b00000010], limit_po(30)),
            (vec![0b00000000, 0b00000000, 0b00000000, 0b00000001], limit_po(31)),
        ];

        for (prefix, want) in test_cases {
            let mut addr = [0u8; ADDRESS_SIZE];
            addr[..prefix.len()].copy_from_slice(&prefix);
            assert_eq!(proximity(&base, &addr), want, "address prefix {prefix:?}");
        }
    }

    #[test]
    fn test_proximity_ignores_bits_past_max_po() {
        let base = [0u8; ADDRESS_SIZE];
        let mut addr = [0u8; ADDRESS_SIZE];
        addr[4] = 0xff;
        addr[31] = 0x01;
        assert_eq!(proximity(&base, &addr), MAX_PO);
    }

    #[test]
    fn test_proximity_is_symmetric() {
        let a = [0b1010_1010u8; ADDRESS_SIZE];
        let b = [0b1010_0000u8; ADDRESS_SIZE];
        assert_eq!(proximity(&a, &b), 4);
        assert_eq!(proximity(&b, &a), 4);
    }
}
