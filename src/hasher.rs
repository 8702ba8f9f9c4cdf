//! Byte-string hashing used by the engine hooks.

use core::hash::{BuildHasher, Hasher};

/// Hashes a byte string to 64 bits.
///
/// Implementations must be deterministic for a given instance: the same bytes
/// always hash the same, whichever representation supplied them.
pub trait ByteHasher {
    fn hash_bytes(&self, bytes: &[u8]) -> u64;
}

/// XXH3-64 over the raw bytes. The default hasher.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Xxh3 {
    seed: u64,
}

impl Xxh3 {
    pub const fn new() -> Self {
        Self { seed: 0 }
    }

    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl ByteHasher for Xxh3 {
    #[inline]
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        twox_hash::xxh3::hash64_with_seed(bytes, self.seed)
    }
}

/// Adapts any [`BuildHasher`] by writing the bytes as a single slice.
///
/// Note that `RandomState` is only deterministic per instance; clones share
/// its keys, separately constructed instances do not.
#[derive(Clone, Debug, Default)]
pub struct StdBuildHasher<S>(pub S);

impl<S: BuildHasher> ByteHasher for StdBuildHasher<S> {
    #[inline]
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        let mut h = self.0.build_hasher();
        h.write(bytes);
        h.finish()
    }
}
