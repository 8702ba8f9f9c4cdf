//! score-map: a compact field -> score map for sorted-set style data types.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: store each (field, score) pair in exactly one allocation and look
//!   entries up by a borrowed byte probe without building a stored object.
//! - Layers:
//!   - `entry::Entry`: packed codec. `[field][0x00][score LE bits]`, reported
//!     length is the field length only.
//!   - `policy::ObjectPolicy`: the hook set (hash, equal, alloc size,
//!     expiry, destroy) an engine calls back into. `Lookup` tags whether a
//!     hook is looking at a stored object or a probe.
//!   - `dense_table::DenseTable<P>`: generic engine over
//!     `hashbrown::HashTable`, owning probing, growth and iteration.
//!   - `ScoreMap<H>`: public API (add_or_update, add_or_skip, erase, find,
//!     clear, iteration) built from the engine primitives.
//!
//! Constraints
//! - Single-threaded: no internal synchronization; callers serialize access.
//! - Hash and equality depend on field bytes only, so
//!   `hash(Stored(e)) == hash(Probe(e.field()))` for every entry.
//! - Every entry is owned by the table and released through
//!   `ObjectPolicy::destroy` exactly once, on replacement, erase or clear.
//! - Scores are stored as raw IEEE-754 bits; NaN payloads and signed zero
//!   survive unchanged.
//!
//! Failure semantics
//! - Allocation failure while encoding an entry aborts via the global
//!   allocator. `try_reserve` is the only fallible operation.
//! - Missing fields are ordinary `None` / `false` results.
//!
//! Notes and non-goals
//! - No ordering or rank queries; a full sorted set pairs this with an
//!   ordered structure.
//! - Score entries carry no TTL (`TtlCapability::Unsupported`); the engine
//!   supports TTL-capable policies for other object kinds.
//! - No persistence format.
//!
//! ```
//! use score_map::ScoreMap;
//!
//! let mut m = ScoreMap::new();
//! let (_, inserted) = m.add_or_update(b"user:1", 3.5);
//! assert!(inserted);
//! assert_eq!(m.find(b"user:1"), Some(3.5));
//!
//! let (e, inserted) = m.add_or_skip(b"user:1", 9.9);
//! assert!(!inserted);
//! assert_eq!(e.score(), 3.5);
//!
//! assert!(m.erase(b"user:1"));
//! assert_eq!(m.find(b"user:1"), None);
//! ```

pub mod dense_table;
pub mod entry;
mod error;
pub mod hasher;
pub mod policy;
mod reentrancy;
mod score_map;
mod score_map_proptest;

// Public surface
pub use entry::Entry;
pub use error::{Result, ScoreMapError};
pub use hasher::{ByteHasher, StdBuildHasher, Xxh3};
pub use policy::{Expiry, Lookup, ObjectPolicy, TtlCapability};
pub use score_map::{Iter, ScoreEntry, ScoreMap, ScorePolicy};
