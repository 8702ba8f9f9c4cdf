//! DenseTable: generic open-addressing engine driven by an [`ObjectPolicy`].
//!
//! The table owns placement, probing, growth and iteration. It never looks
//! inside an object; every hash, comparison, size query and free goes through
//! the policy hooks, and every object leaving the table (replaced, erased or
//! cleared) is released through `ObjectPolicy::destroy` exactly once.

use crate::error::{Result, ScoreMapError};
use crate::policy::{Expiry, Lookup, ObjectPolicy, TtlCapability};
use crate::reentrancy::DebugReentrancy;
use hashbrown::hash_table;
use hashbrown::HashTable;
use tracing::{debug, trace, warn};

pub struct DenseTable<P: ObjectPolicy> {
    policy: P,
    table: HashTable<P::Object>,
    obj_malloc_used: usize,
    // Clock used to evaluate `Expiry::At` for TTL-capable policies.
    now: u32,
    reentrancy: DebugReentrancy,
}

impl<P: ObjectPolicy> DenseTable<P> {
    pub fn new(policy: P) -> Self {
        Self::with_capacity(0, policy)
    }

    pub fn with_capacity(capacity: usize, policy: P) -> Self {
        Self {
            policy,
            table: HashTable::with_capacity(capacity),
            obj_malloc_used: 0,
            now: 0,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Hooks this table calls back into.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Number of stored objects, including due objects not yet reclaimed.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Objects the table can hold without growing.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Sum of `alloc_size` over live objects.
    pub fn obj_malloc_used(&self) -> usize {
        self.obj_malloc_used
    }

    /// Lower-bound estimate of the bucket array footprint: one object slot
    /// and one control byte per unit of item capacity. The real bucket count
    /// is a power of two above capacity, so actual usage is higher.
    pub fn table_malloc_used(&self) -> usize {
        self.table.capacity() * (core::mem::size_of::<P::Object>() + 1)
    }

    pub fn time_now(&self) -> u32 {
        self.now
    }

    /// Advance the clock against which object expiry is evaluated.
    pub fn set_time(&mut self, now: u32) {
        self.now = now;
    }

    #[inline]
    fn has_ttl(policy: &P, obj: &P::Object) -> bool {
        match P::TTL {
            TtlCapability::Unsupported => false,
            TtlCapability::Supported => policy.expire_time(obj) != Expiry::Never,
        }
    }

    #[inline]
    fn is_expired(&self, obj: &P::Object) -> bool {
        Self::due(&self.policy, self.now, obj)
    }

    #[inline]
    fn due(policy: &P, now: u32, obj: &P::Object) -> bool {
        match P::TTL {
            TtlCapability::Unsupported => false,
            TtlCapability::Supported => policy.expire_time(obj).is_due(now),
        }
    }

    fn release(policy: &P, obj_malloc_used: &mut usize, obj: P::Object) {
        *obj_malloc_used -= policy.alloc_size(&obj);
        let has_ttl = Self::has_ttl(policy, &obj);
        policy.destroy(obj, has_ttl);
    }

    /// Insert `obj`, replacing an equal stored object if there is one.
    ///
    /// A replaced object is released through `destroy`. Returns the
    /// now-stored object and whether the key was new. Replacing a due object
    /// counts as a new key.
    pub fn upsert_replace(&mut self, obj: P::Object) -> (&P::Object, bool) {
        let _g = self.reentrancy.enter("upsert_replace");
        let policy = &self.policy;
        let now = self.now;
        let hash = policy.hash(Lookup::Stored(&obj));
        self.obj_malloc_used += policy.alloc_size(&obj);
        match self.table.entry(
            hash,
            |stored| policy.equal(stored, Lookup::Stored(&obj)),
            |stored| policy.hash(Lookup::Stored(stored)),
        ) {
            hash_table::Entry::Occupied(mut o) => {
                let prev = core::mem::replace(o.get_mut(), obj);
                let expired = Self::due(policy, now, &prev);
                Self::release(policy, &mut self.obj_malloc_used, prev);
                trace!(hash, expired, "replaced stored object");
                (o.into_mut(), expired)
            }
            hash_table::Entry::Vacant(v) => (v.insert(obj).into_mut(), true),
        }
    }

    /// Look up by probe bytes without building a stored object.
    pub fn find_by_probe(&self, key: &[u8]) -> Option<&P::Object> {
        let _g = self.reentrancy.enter("find_by_probe");
        let policy = &self.policy;
        let hash = policy.hash(Lookup::Probe(key));
        self.table
            .find(hash, |stored| policy.equal(stored, Lookup::Probe(key)))
            .filter(|obj| !self.is_expired(obj))
    }

    /// Return the object matching `key`, or insert `make()` if there is none.
    ///
    /// `make` must build an object whose key bytes are `key`. The boolean is
    /// true when `make` ran. A due object is released and replaced.
    pub fn find_or_insert_with<F>(&mut self, key: &[u8], make: F) -> (&P::Object, bool)
    where
        F: FnOnce() -> P::Object,
    {
        let _g = self.reentrancy.enter("find_or_insert_with");
        let policy = &self.policy;
        let now = self.now;
        let hash = policy.hash(Lookup::Probe(key));
        match self.table.entry(
            hash,
            |stored| policy.equal(stored, Lookup::Probe(key)),
            |stored| policy.hash(Lookup::Stored(stored)),
        ) {
            hash_table::Entry::Occupied(mut o) => {
                if !Self::due(policy, now, o.get()) {
                    return (o.into_mut(), false);
                }
                let obj = make();
                debug_assert_eq!(policy.hash(Lookup::Stored(&obj)), hash);
                self.obj_malloc_used += policy.alloc_size(&obj);
                let prev = core::mem::replace(o.get_mut(), obj);
                Self::release(policy, &mut self.obj_malloc_used, prev);
                (o.into_mut(), true)
            }
            hash_table::Entry::Vacant(v) => {
                let obj = make();
                debug_assert_eq!(policy.hash(Lookup::Stored(&obj)), hash);
                self.obj_malloc_used += policy.alloc_size(&obj);
                (v.insert(obj).into_mut(), true)
            }
        }
    }

    /// Unlink and destroy the object matching `key`. Returns whether a live
    /// one was found; a due object is reclaimed but reported absent.
    pub fn erase_by_probe(&mut self, key: &[u8]) -> bool {
        let _g = self.reentrancy.enter("erase_by_probe");
        let policy = &self.policy;
        let now = self.now;
        let hash = policy.hash(Lookup::Probe(key));
        match self
            .table
            .find_entry(hash, |stored| policy.equal(stored, Lookup::Probe(key)))
        {
            Ok(o) => {
                let (obj, _) = o.remove();
                let expired = Self::due(policy, now, &obj);
                Self::release(policy, &mut self.obj_malloc_used, obj);
                !expired
            }
            Err(_) => false,
        }
    }

    /// Release every due object. Returns how many were reclaimed.
    pub fn expire_due(&mut self) -> usize {
        let _g = self.reentrancy.enter("expire_due");
        if P::TTL == TtlCapability::Unsupported {
            return 0;
        }
        let policy = &self.policy;
        let now = self.now;
        let hashes: Vec<u64> = self
            .table
            .iter()
            .filter(|obj| Self::due(policy, now, obj))
            .map(|obj| policy.hash(Lookup::Stored(obj)))
            .collect();
        let mut reclaimed = 0;
        for hash in hashes {
            if let Ok(o) = self.table.find_entry(hash, |obj| Self::due(policy, now, obj)) {
                let (obj, _) = o.remove();
                Self::release(policy, &mut self.obj_malloc_used, obj);
                reclaimed += 1;
            }
        }
        if reclaimed > 0 {
            debug!(reclaimed, now, "reclaimed due objects");
        }
        reclaimed
    }

    /// Destroy every object. Keeps the allocated bucket array.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter("clear");
        let count = self.table.len();
        if count == 0 {
            return;
        }
        let released = self.obj_malloc_used;
        for obj in self.table.drain() {
            Self::release(&self.policy, &mut self.obj_malloc_used, obj);
        }
        debug_assert_eq!(self.obj_malloc_used, 0);
        debug!(count, released, "cleared dense table");
    }

    /// Make room for `additional` more objects, growing if needed.
    pub fn reserve(&mut self, additional: usize) {
        let _g = self.reentrancy.enter("reserve");
        let before = self.table.capacity();
        let policy = &self.policy;
        self.table
            .reserve(additional, |stored| policy.hash(Lookup::Stored(stored)));
        let after = self.table.capacity();
        if after != before {
            debug!(additional, before, after, "grew dense table");
        }
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let _g = self.reentrancy.enter("try_reserve");
        let policy = &self.policy;
        self.table
            .try_reserve(additional, |stored| policy.hash(Lookup::Stored(stored)))
            .map_err(|e| {
                warn!(additional, len = self.table.len(), "reserve failed");
                ScoreMapError::from_reserve(additional, e)
            })
    }

    pub fn shrink_to_fit(&mut self) {
        let _g = self.reentrancy.enter("shrink_to_fit");
        let before = self.table.capacity();
        let policy = &self.policy;
        self.table
            .shrink_to_fit(|stored| policy.hash(Lookup::Stored(stored)));
        let after = self.table.capacity();
        if after != before {
            debug!(before, after, "shrank dense table");
        }
    }

    /// Iterate live objects in unspecified order. Expired objects are skipped.
    pub fn iter(&self) -> Iter<'_, P> {
        Iter {
            it: self.table.iter(),
            table: self,
        }
    }
}

impl<P: ObjectPolicy> Drop for DenseTable<P> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Iterator over objects stored in a [`DenseTable`].
pub struct Iter<'a, P: ObjectPolicy> {
    it: hash_table::Iter<'a, P::Object>,
    table: &'a DenseTable<P>,
}

impl<'a, P: ObjectPolicy> Iterator for Iter<'a, P> {
    type Item = &'a P::Object;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        self.it.by_ref().find(|obj| !table.is_expired(obj))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match P::TTL {
            TtlCapability::Unsupported => self.it.size_hint(),
            TtlCapability::Supported => (0, self.it.size_hint().1),
        }
    }
}
