//! ScoreMap: field -> score lookup over packed [`Entry`] objects.

use crate::dense_table::{self, DenseTable};
use crate::entry::Entry;
use crate::error::Result;
use crate::hasher::{ByteHasher, Xxh3};
use crate::policy::{Expiry, Lookup, ObjectPolicy, TtlCapability};
use core::fmt;

/// Engine hooks for packed score entries.
///
/// Stored entries and probe keys hash and compare by their field bytes
/// alone, so a probe lands on the same stored entry an equal field would.
#[derive(Clone, Debug, Default)]
pub struct ScorePolicy<H = Xxh3> {
    hasher: H,
}

impl<H> ScorePolicy<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }
}

#[inline]
fn field_of<'a>(obj: Lookup<'a, Entry>) -> &'a [u8] {
    match obj {
        Lookup::Stored(e) => e.field(),
        Lookup::Probe(bytes) => bytes,
    }
}

impl<H: ByteHasher> ObjectPolicy for ScorePolicy<H> {
    type Object = Entry;

    // Score entries never expire.
    const TTL: TtlCapability = TtlCapability::Unsupported;

    #[inline]
    fn hash(&self, obj: Lookup<'_, Entry>) -> u64 {
        self.hasher.hash_bytes(field_of(obj))
    }

    #[inline]
    fn equal(&self, stored: &Entry, other: Lookup<'_, Entry>) -> bool {
        let left = stored.field();
        let right = field_of(other);
        if left.len() != right.len() {
            return false;
        }
        left.is_empty() || left == right
    }

    #[inline]
    fn alloc_size(&self, obj: &Entry) -> usize {
        obj.alloc_size()
    }

    #[inline]
    fn expire_time(&self, _obj: &Entry) -> Expiry {
        Expiry::Never
    }

    #[inline]
    fn destroy(&self, obj: Entry, _has_ttl: bool) {
        drop(obj);
    }
}

/// Borrowed view of a stored entry, returned by insertions and lookups.
#[derive(Copy, Clone)]
pub struct ScoreEntry<'a> {
    entry: &'a Entry,
}

impl<'a> ScoreEntry<'a> {
    pub fn field(&self) -> &'a [u8] {
        self.entry.field()
    }

    pub fn score(&self) -> f64 {
        self.entry.score()
    }

    pub fn into_pair(self) -> (&'a [u8], f64) {
        (self.entry.field(), self.entry.score())
    }

    /// The packed allocation behind this view.
    pub fn raw(&self) -> &'a Entry {
        self.entry
    }
}

impl fmt::Debug for ScoreEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.entry, f)
    }
}

/// Field -> score map storing each pair in a single packed allocation.
///
/// Fields are unique byte strings. Single-threaded; all access must be
/// serialized by the caller.
pub struct ScoreMap<H: ByteHasher = Xxh3> {
    table: DenseTable<ScorePolicy<H>>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::with_hasher(Xxh3::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Xxh3::new())
    }
}

impl Default for ScoreMap {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ByteHasher> ScoreMap<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            table: DenseTable::with_capacity(capacity, ScorePolicy::new(hasher)),
        }
    }

    /// Hooks this map hands to its engine.
    pub fn hooks(&self) -> &ScorePolicy<H> {
        self.table.policy()
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when no field is stored.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Fields the map can hold without growing.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Insert `field` with `score`, replacing any existing score.
    ///
    /// Returns the stored entry and whether the field was newly inserted.
    pub fn add_or_update(&mut self, field: &[u8], score: f64) -> (ScoreEntry<'_>, bool) {
        let (entry, inserted) = self.table.upsert_replace(Entry::encode(field, score));
        (ScoreEntry { entry }, inserted)
    }

    /// Insert `field` with `score` only if the field is absent.
    ///
    /// An existing entry is returned unmodified and `score` is discarded.
    pub fn add_or_skip(&mut self, field: &[u8], score: f64) -> (ScoreEntry<'_>, bool) {
        // The entry is only encoded on a miss; hits never allocate.
        let (entry, inserted) = self
            .table
            .find_or_insert_with(field, || Entry::encode(field, score));
        (ScoreEntry { entry }, inserted)
    }

    /// Remove `field`. Returns whether it was present.
    pub fn erase(&mut self, field: &[u8]) -> bool {
        self.table.erase_by_probe(field)
    }

    /// Score stored for `field`, if present.
    pub fn find(&self, field: &[u8]) -> Option<f64> {
        self.table.find_by_probe(field).map(Entry::score)
    }

    /// View of the stored entry for `field`, if present.
    pub fn get(&self, field: &[u8]) -> Option<ScoreEntry<'_>> {
        self.table
            .find_by_probe(field)
            .map(|entry| ScoreEntry { entry })
    }

    /// Whether `field` is present.
    pub fn contains(&self, field: &[u8]) -> bool {
        self.table.find_by_probe(field).is_some()
    }

    /// Destroy every entry. Idempotent.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Make room for `additional` more fields, growing if needed.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Like [`reserve`](Self::reserve), but reports allocation failure.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.table.try_reserve(additional)
    }

    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Bytes held by entry allocations.
    pub fn obj_malloc_used(&self) -> usize {
        self.table.obj_malloc_used()
    }

    /// Estimated bytes held by the table's bucket array.
    pub fn table_malloc_used(&self) -> usize {
        self.table.table_malloc_used()
    }

    pub fn malloc_used(&self) -> usize {
        self.obj_malloc_used() + self.table_malloc_used()
    }

    /// Iterate `(field, score)` pairs in unspecified order.
    pub fn iter(&self) -> Iter<'_, H> {
        Iter {
            it: self.table.iter(),
        }
    }
}

/// Iterator over `(field, score)` pairs of a [`ScoreMap`].
pub struct Iter<'a, H: ByteHasher> {
    it: dense_table::Iter<'a, ScorePolicy<H>>,
}

impl<'a, H: ByteHasher> Iterator for Iter<'a, H> {
    type Item = (&'a [u8], f64);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| (e.field(), e.score()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, H: ByteHasher> IntoIterator for &'a ScoreMap<H> {
    type Item = (&'a [u8], f64);
    type IntoIter = Iter<'a, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<H: ByteHasher, F: AsRef<[u8]>> Extend<(F, f64)> for ScoreMap<H> {
    fn extend<I: IntoIterator<Item = (F, f64)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(lower);
        for (field, score) in iter {
            self.add_or_update(field.as_ref(), score);
        }
    }
}

impl<F: AsRef<[u8]>> FromIterator<(F, f64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (F, f64)>>(iter: I) -> Self {
        let mut map = ScoreMap::new();
        map.extend(iter);
        map
    }
}

impl<H: ByteHasher> fmt::Debug for ScoreMap<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .map(|(field, score)| (String::from_utf8_lossy(field), score)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::StdBuildHasher;
    use std::collections::hash_map::RandomState;

    #[derive(Clone, Default)]
    struct ConstHasher;
    impl ByteHasher for ConstHasher {
        fn hash_bytes(&self, _bytes: &[u8]) -> u64 {
            0 // force every field into the same probe chain
        }
    }

    /// Invariant: first insert reports `inserted`, the update does not and
    /// leaves exactly one entry holding the new score.
    #[test]
    fn add_or_update_replaces_score() {
        let mut m = ScoreMap::new();
        let (e, inserted) = m.add_or_update(b"user:1", 3.5);
        assert!(inserted);
        assert_eq!(e.field(), b"user:1");
        assert_eq!(e.score(), 3.5);
        assert_eq!(m.find(b"user:1"), Some(3.5));

        let (e, inserted) = m.add_or_update(b"user:1", 7.0);
        assert!(!inserted);
        assert_eq!(e.score(), 7.0);
        assert_eq!(m.find(b"user:1"), Some(7.0));
        assert_eq!(m.len(), 1);
    }

    /// Invariant: add_or_skip keeps the existing score and discards the new one.
    #[test]
    fn add_or_skip_preserves_existing() {
        let mut m = ScoreMap::new();
        m.add_or_update(b"user:1", 7.0);
        let (e, inserted) = m.add_or_skip(b"user:1", 9.9);
        assert!(!inserted);
        assert_eq!(e.score(), 7.0);
        assert_eq!(m.find(b"user:1"), Some(7.0));

        let (e, inserted) = m.add_or_skip(b"user:2", 1.0);
        assert!(inserted);
        assert_eq!(e.into_pair(), (&b"user:2"[..], 1.0));
        assert_eq!(m.len(), 2);
    }

    /// Invariant: add_or_skip on a hit does not allocate, so object memory
    /// stays constant.
    #[test]
    fn add_or_skip_hit_leaves_accounting_unchanged() {
        let mut m = ScoreMap::new();
        m.add_or_update(b"k", 1.0);
        let before = m.obj_malloc_used();
        m.add_or_skip(b"k", 2.0);
        assert_eq!(m.obj_malloc_used(), before);
    }

    #[test]
    fn erase_reports_presence() {
        let mut m = ScoreMap::new();
        assert!(!m.erase(b"user:1"));
        m.add_or_update(b"user:1", 7.0);
        assert!(m.erase(b"user:1"));
        assert_eq!(m.find(b"user:1"), None);
        assert!(!m.contains(b"user:1"));
        assert!(!m.erase(b"user:1"));
    }

    #[test]
    fn clear_empties_and_is_idempotent() {
        let mut m = ScoreMap::new();
        for i in 0..100 {
            m.add_or_update(format!("f{i}").as_bytes(), i as f64);
        }
        assert_eq!(m.len(), 100);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.obj_malloc_used(), 0);
        for i in 0..100 {
            assert_eq!(m.find(format!("f{i}").as_bytes()), None);
        }
        m.clear();
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn empty_field_is_a_regular_key() {
        let mut m = ScoreMap::new();
        let (_, inserted) = m.add_or_update(b"", 1.25);
        assert!(inserted);
        assert_eq!(m.find(b""), Some(1.25));
        let (_, inserted) = m.add_or_update(b"", 2.5);
        assert!(!inserted);
        assert_eq!(m.find(b""), Some(2.5));
        assert!(m.erase(b""));
        assert_eq!(m.find(b""), None);
    }

    /// Invariant: stored and probe representations of the same bytes hash
    /// equal and compare equal; different bytes compare unequal.
    #[test]
    fn hooks_agree_across_representations() {
        let p = ScorePolicy::new(Xxh3::new());
        let fields: [&[u8]; 5] = [b"", b"a", b"user:1", b"a\0b", &[0xff; 64]];
        for f in fields {
            let e = Entry::encode(f, 0.5);
            assert_eq!(p.hash(Lookup::Stored(&e)), p.hash(Lookup::Probe(f)));
            assert!(p.equal(&e, Lookup::Probe(f)));
            assert!(p.equal(&e, Lookup::Stored(&Entry::encode(f, -1.0))));
        }
        let e = Entry::encode(b"abc", 0.0);
        assert!(!p.equal(&e, Lookup::Probe(b"abd")));
        assert!(!p.equal(&e, Lookup::Probe(b"ab")));
        assert!(!p.equal(&e, Lookup::Probe(b"")));
        assert!(!p.equal(&Entry::encode(b"", 0.0), Lookup::Probe(b"x")));
    }

    #[test]
    fn hooks_report_size_and_no_expiry() {
        let p = ScorePolicy::<Xxh3>::default();
        let e = Entry::encode(b"abc", 0.0);
        assert!(p.alloc_size(&e) >= 3 + 1 + 8);
        assert_eq!(p.expire_time(&e), Expiry::Never);
        assert_eq!(<ScorePolicy as ObjectPolicy>::TTL, TtlCapability::Unsupported);
        p.destroy(e, true);
    }

    #[test]
    fn collisions_resolved_by_field_bytes() {
        let mut m = ScoreMap::with_hasher(ConstHasher);
        m.add_or_update(b"a", 1.0);
        m.add_or_update(b"b", 2.0);
        m.add_or_update(b"", 3.0);
        assert_eq!(m.find(b"a"), Some(1.0));
        assert_eq!(m.find(b"b"), Some(2.0));
        assert_eq!(m.find(b""), Some(3.0));
        assert!(m.erase(b"a"));
        assert_eq!(m.find(b"b"), Some(2.0));
        assert_eq!(m.find(b"a"), None);
    }

    #[test]
    fn works_with_std_build_hasher() {
        let mut m = ScoreMap::with_hasher(StdBuildHasher(RandomState::new()));
        for i in 0..64 {
            m.add_or_update(&[i as u8], i as f64);
        }
        for i in 0..64 {
            assert_eq!(m.find(&[i as u8]), Some(i as f64));
        }
    }

    #[test]
    fn iteration_yields_each_pair_once() {
        let mut m = ScoreMap::new();
        m.add_or_update(b"a", 1.0);
        m.add_or_update(b"b", 2.0);
        m.add_or_update(b"a", 3.0);
        let mut pairs: Vec<(Vec<u8>, f64)> =
            m.iter().map(|(f, s)| (f.to_vec(), s)).collect();
        pairs.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(pairs, vec![(b"a".to_vec(), 3.0), (b"b".to_vec(), 2.0)]);
        assert_eq!((&m).into_iter().count(), 2);
    }

    #[test]
    fn accounting_follows_entries() {
        let mut m = ScoreMap::with_capacity(16);
        assert!(m.capacity() >= 16);
        assert_eq!(m.obj_malloc_used(), 0);
        m.add_or_update(b"abcd", 1.0);
        assert_eq!(m.obj_malloc_used(), 4 + 9);
        m.add_or_update(b"abcd", 2.0);
        assert_eq!(m.obj_malloc_used(), 4 + 9);
        m.add_or_update(b"xy", 2.0);
        assert_eq!(m.obj_malloc_used(), 4 + 9 + 2 + 9);
        assert!(m.malloc_used() > m.obj_malloc_used());
        m.erase(b"abcd");
        assert_eq!(m.obj_malloc_used(), 2 + 9);
    }

    #[test]
    fn from_iter_and_extend_use_last_write() {
        let mut m: ScoreMap = vec![("a", 1.0), ("b", 2.0), ("a", 5.0)].into_iter().collect();
        assert_eq!(m.len(), 2);
        assert_eq!(m.find(b"a"), Some(5.0));
        m.extend([(b"c".to_vec(), 3.0)]);
        assert_eq!(m.find(b"c"), Some(3.0));
    }

    #[test]
    fn get_returns_view_of_stored_entry() {
        let mut m = ScoreMap::new();
        m.add_or_update(b"user:1", -0.0);
        let e = m.get(b"user:1").unwrap();
        assert_eq!(e.field(), b"user:1");
        assert_eq!(e.score().to_bits(), (-0.0f64).to_bits());
        assert_eq!(e.raw().as_bytes_with_nul(), b"user:1\0");
        assert!(m.get(b"user:2").is_none());
    }

    #[test]
    fn debug_lists_pairs() {
        let mut m = ScoreMap::new();
        m.add_or_update(b"a", 1.5);
        assert_eq!(format!("{:?}", m), r#"{"a": 1.5}"#);
    }
}
