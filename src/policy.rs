//! Hook interface between the generic engine and the objects it stores.
//!
//! The engine never inspects objects itself. It hashes, compares, sizes,
//! expires and frees them exclusively through an [`ObjectPolicy`]. Lookups
//! may be made with a borrowed byte probe instead of a stored object, so the
//! hooks take a [`Lookup`] that names which representation is in hand.

/// Either a stored object or a borrowed probe key.
pub enum Lookup<'a, T> {
    Stored(&'a T),
    Probe(&'a [u8]),
}

impl<'a, T> Clone for Lookup<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Lookup<'a, T> {}

impl<'a, T> core::fmt::Debug for Lookup<'a, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Lookup::Stored(_) => f.write_str("Stored(..)"),
            Lookup::Probe(b) => f.debug_tuple("Probe").field(b).finish(),
        }
    }
}

/// Expiry of a single object.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Expiry {
    Never,
    /// Expires once the engine clock reaches this value.
    At(u32),
}

impl Expiry {
    #[inline]
    pub fn is_due(self, now: u32) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(t) => t <= now,
        }
    }
}

/// Whether objects of a policy can carry a TTL at all.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TtlCapability {
    /// `expire_time` always reports [`Expiry::Never`] and the engine does not
    /// consult it on lookup.
    Unsupported,
    Supported,
}

/// The five hooks a [`DenseTable`](crate::dense_table::DenseTable) calls back into.
///
/// Contract:
/// - `hash(Stored(o)) == hash(Probe(b))` whenever `o`'s key bytes equal `b`.
/// - `equal(s, x)` is true iff `s` and `x` have the same key bytes; equal keys
///   must hash equal.
pub trait ObjectPolicy {
    type Object;

    const TTL: TtlCapability;

    fn hash(&self, obj: Lookup<'_, Self::Object>) -> u64;

    fn equal(&self, stored: &Self::Object, other: Lookup<'_, Self::Object>) -> bool;

    /// Bytes owned by `obj` outside the table, for memory accounting only.
    fn alloc_size(&self, obj: &Self::Object) -> usize;

    fn expire_time(&self, obj: &Self::Object) -> Expiry;

    /// Release `obj`. Called exactly once per object removed from the table.
    fn destroy(&self, obj: Self::Object, has_ttl: bool);
}
