//! Packed entry codec: one allocation per (field, score) pair.
//!
//! Layout of the backing buffer:
//!
//! ```text
//! [ field bytes (N) ][ 0x00 ][ score: 8 bytes, little-endian f64 bits ]
//! ```
//!
//! The reported length of an entry is `N`. The sentinel and score bytes are
//! part of the allocation but not of the field, so the field can be handed to
//! anything expecting a length-delimited (or NUL-terminated) byte string.

use core::fmt;

/// Bytes between the end of the field and the score payload.
pub const SENTINEL_LEN: usize = 1;
/// Size of the encoded score payload.
pub const SCORE_LEN: usize = 8;
/// Bytes an entry allocates beyond its field.
pub const ENTRY_OVERHEAD: usize = SENTINEL_LEN + SCORE_LEN;

/// Raw IEEE-754 bit pattern of `score`, little-endian.
///
/// This is a bit reinterpretation, not a numeric conversion: NaN payloads,
/// the sign of zero and infinities survive unchanged.
#[inline]
pub fn score_to_le_bytes(score: f64) -> [u8; SCORE_LEN] {
    score.to_bits().to_le_bytes()
}

/// Inverse of [`score_to_le_bytes`].
#[inline]
pub fn score_from_le_bytes(bytes: [u8; SCORE_LEN]) -> f64 {
    f64::from_bits(u64::from_le_bytes(bytes))
}

/// A single packed field/score allocation.
///
/// Move-only: the owner of an `Entry` is the only party able to free it, and
/// dropping it releases the allocation exactly once.
pub struct Entry {
    buf: Box<[u8]>,
}

impl Entry {
    /// Encode `field` and `score` into a fresh allocation.
    ///
    /// Allocation failure aborts through the global allocator's
    /// `handle_alloc_error`; no partially built entry is ever observable.
    pub fn encode(field: &[u8], score: f64) -> Self {
        let mut buf = Vec::with_capacity(field.len() + ENTRY_OVERHEAD);
        if !field.is_empty() {
            buf.extend_from_slice(field);
        }
        buf.push(0);
        buf.extend_from_slice(&score_to_le_bytes(score));
        debug_assert_eq!(buf.len(), field.len() + ENTRY_OVERHEAD);
        Entry {
            buf: buf.into_boxed_slice(),
        }
    }

    /// Reported length: the field size, excluding sentinel and score.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - ENTRY_OVERHEAD
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn field(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Field followed by its terminating sentinel byte.
    #[inline]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..self.score_offset()]
    }

    /// Offset of the score payload; always `len() + 1`.
    #[inline]
    pub fn score_offset(&self) -> usize {
        self.len() + SENTINEL_LEN
    }

    /// Decode the stored score.
    #[inline]
    pub fn score(&self) -> f64 {
        let off = self.score_offset();
        let mut raw = [0u8; SCORE_LEN];
        raw.copy_from_slice(&self.buf[off..off + SCORE_LEN]);
        score_from_le_bytes(raw)
    }

    /// Size of the backing allocation in bytes.
    ///
    /// The global allocator does not expose usable sizes, so this is the
    /// requested layout size; it is never below `len() + ENTRY_OVERHEAD`.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.buf.len()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("field", &String::from_utf8_lossy(self.field()))
            .field("score", &self.score())
            .finish()
    }
}
