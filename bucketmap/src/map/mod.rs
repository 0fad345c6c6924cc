//! This module contains concurrent hash table implementations.

mod bucket;
mod coarse_map;
mod lock_free_map;
mod striped_map;

pub use coarse_map::CoarseMap;
pub use lock_free_map::LockFreeMap;
pub use striped_map::StripedHashMap;

use crate::error::Result;
use std::hash::Hash;

/// Common functionalities for concurrent hash tables.
///
/// The striped, coarse and lock-free tables all implement this trait, so the
/// same tests and collaborators run against any of them.
pub trait ConcurrentMap {
    /// Key type for a table implementation.
    type Key: Hash + Eq;
    /// Value type for a table implementation.
    type Val;

    /// Get a copy of the value associated with a key, if it exists.
    fn get(&self, key: &Self::Key) -> Option<Self::Val>;

    /// Check whether the table contains a value mapped to the given key.
    fn contains(&self, key: &Self::Key) -> bool;

    /// Emplaces a key-value pair into the table.
    ///
    /// If there were a key-value pair associated with this provided key,
    /// it will be overwritten. Fails only when a fixed-capacity table has no
    /// room for a new key, or when growing the table fails.
    fn put(&self, key: Self::Key, value: Self::Val) -> Result<()>;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Returns `true` if the table holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets in the directory currently in effect.
    fn capacity(&self) -> usize;
}
