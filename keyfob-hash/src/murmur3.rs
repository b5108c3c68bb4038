//! MurmurHash3, x86 32-bit variant.
//!
//! Not a cryptographic hash. It only serves to turn token labels into short, stable identifiers.

const C1: u32 = 0xcc9e2d51;
const C2: u32 = 0x1b873593;

/// Hash `data` with a seed of `0`. Empty input yields `0`.
#[must_use]
pub fn murmur3_32(data: &[u8]) -> u32 {
    seeded(data, 0)
}

fn seeded(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);

        h ^= mix(k);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let k = tail
            .iter()
            .rev()
            .fold(0_u32, |k, &b| (k << 8) | u32::from(b));
        h ^= mix(k);
    }

    // Only the low 32 bits of the length take part, same as the reference implementation.
    h ^= data.len() as u32;

    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;

    h
}

#[inline]
fn mix(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(0, murmur3_32(b""));
    }

    #[test]
    fn reference_values() {
        assert_eq!(0x2362f9de, murmur3_32(b"\0\0\0\0"));
        assert_eq!(0x76293b50, murmur3_32(b"\xff\xff\xff\xff"));
        assert_eq!(0xf55b516b, murmur3_32(b"!Ce\x87"));
        assert_eq!(0x248bfa47, murmur3_32(b"hello"));
    }

    #[test]
    fn tail_lengths() {
        assert_eq!(0x72661cf4, murmur3_32(b"!"));
        assert_eq!(0xa0f7b07a, murmur3_32(b"!C"));
        assert_eq!(0x7e4a8634, murmur3_32(b"!Ce"));
    }

    #[test]
    fn seed_changes_result() {
        assert_eq!(0x514e28b7, seeded(b"", 1));
        assert_eq!(0x5a97808a, seeded(b"aaaa", 0x9747b28c));
        assert_eq!(0x24884cba, seeded(b"Hello, world!", 0x9747b28c));
    }
}
