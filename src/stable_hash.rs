//! Frozen key hashing and seed derivation.
//!
//! Every logged probability is only replayable if the same `(app_id, key)`
//! produces the same seed forever. The hash below is therefore a versioned
//! external contract: changing a single constant silently invalidates every
//! experiment logged with the old one.
//!
//! Algorithm:
//! - trim leading/trailing bytes `<= 0x20`
//! - an all-ASCII-digit key hashes to its decimal value (wrapping)
//! - anything else is MurmurHash3 (x86, 32-bit, seed 0) over the UTF-8 bytes

/// Version tag of the key hash. Bump only together with a migration story.
pub const KEY_HASH_VERSION: u32 = 1;

/// MurmurHash3 x86_32.
#[must_use]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);

        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    let mut k: u32 = 0;
    if tail.len() >= 3 {
        k ^= u32::from(tail[2]) << 16;
    }
    if tail.len() >= 2 {
        k ^= u32::from(tail[1]) << 8;
    }
    if !tail.is_empty() {
        k ^= u32::from(tail[0]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    fmix32(h)
}

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Hash an application id or per-event key.
#[must_use]
pub fn id_hash(s: &str) -> u64 {
    let trimmed = trim_control(s.as_bytes());
    if trimmed.is_empty() {
        return 0;
    }
    if trimmed.iter().all(u8::is_ascii_digit) {
        return trimmed.iter().fold(0u64, |acc, b| {
            acc.wrapping_mul(10).wrapping_add(u64::from(b - b'0'))
        });
    }
    u64::from(murmur3_32(trimmed, 0))
}

fn trim_control(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if *first > 0x20 {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if *last > 0x20 {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Per-event seed: `id_hash(key) + app_hash`, wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Seed(pub u64);

impl Seed {
    /// Derive the seed for `unique_key` under an already-hashed application id.
    #[must_use]
    pub fn derive(app_hash: u64, unique_key: &str) -> Self {
        Seed(id_hash(unique_key).wrapping_add(app_hash))
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Seed {
    fn from(v: u64) -> Self {
        Seed(v)
    }
}
