use crate::error::Result;
use crate::hash::MixState;
use crate::map::{CoarseMap, LockFreeMap, StripedHashMap};
use crate::policy::{CapacityPolicy, GrowthPolicy, DEFAULT_MAX_LOAD_FACTOR};

use std::hash::{BuildHasher, Hash};

/// Builds a [`StripedHashMap`][striped], a [`CoarseMap`][coarse] or a
/// [`LockFreeMap`][lock-free] with various configuration knobs.
///
/// [striped]: ./struct.StripedHashMap.html
/// [coarse]: ./struct.CoarseMap.html
/// [lock-free]: ./struct.LockFreeMap.html
///
/// # Examples
///
/// ```rust
/// use bucketmap::{ConcurrentMap, TableBuilder};
///
/// let table = TableBuilder::new(8) // 8 buckets to start with
///     // Refuse new keys instead of growing once 8 keys are stored.
///     .fixed()
///     .build::<i64, i64>()
///     .expect("8 buckets fit in memory");
///
/// for key in 0..8 {
///     table.put(key, key * 10).unwrap();
/// }
/// assert!(table.put(8, 80).unwrap_err().is_table_full());
///
/// // Updates to existing keys still succeed.
/// table.put(0, -1).unwrap();
/// assert_eq!(table.get(&0), Some(-1));
/// ```
#[derive(Debug, Clone)]
pub struct TableBuilder {
    initial_capacity: usize,
    policy: CapacityPolicy,
    max_load_factor: usize,
}

impl TableBuilder {
    /// Construct a new `TableBuilder` for a table that starts with
    /// `initial_capacity` buckets. Zero is rounded up to one.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity: initial_capacity.max(1),
            policy: CapacityPolicy::default(),
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }

    /// Sets the initial number of buckets. Zero is rounded up to one.
    pub fn initial_capacity(self, capacity: usize) -> Self {
        Self {
            initial_capacity: capacity.max(1),
            ..self
        }
    }

    /// Sets the capacity policy.
    pub fn policy(self, policy: CapacityPolicy) -> Self {
        Self { policy, ..self }
    }

    /// Shorthand for `policy(CapacityPolicy::Elastic)`.
    pub fn elastic(self) -> Self {
        self.policy(CapacityPolicy::Elastic)
    }

    /// Shorthand for `policy(CapacityPolicy::Fixed)`.
    pub fn fixed(self) -> Self {
        self.policy(CapacityPolicy::Fixed)
    }

    /// Sets the average number of entries per bucket at which an elastic
    /// table doubles. Has no effect on fixed tables.
    ///
    /// # Panics
    ///
    /// Panics if `max_load_factor` is zero.
    pub fn max_load_factor(self, max_load_factor: usize) -> Self {
        assert!(max_load_factor > 0, "max_load_factor must be positive");
        Self {
            max_load_factor,
            ..self
        }
    }

    fn growth(&self) -> GrowthPolicy {
        GrowthPolicy::new(self.policy, self.max_load_factor)
    }

    /// Builds a `StripedHashMap<K, V>` hashing keys with [`MixState`].
    pub fn build<K, V>(self) -> Result<StripedHashMap<K, V, MixState>>
    where
        K: Hash + Eq,
    {
        self.build_with_hasher(MixState)
    }

    /// Builds a `StripedHashMap<K, V, S>`, with the given `hasher`.
    pub fn build_with_hasher<K, V, S>(self, hasher: S) -> Result<StripedHashMap<K, V, S>>
    where
        K: Hash + Eq,
        S: BuildHasher,
    {
        log::debug!(
            "building striped table: {} buckets, {:?}",
            self.initial_capacity,
            self.policy
        );
        StripedHashMap::build(self.initial_capacity, self.growth(), hasher)
    }

    /// Builds a `CoarseMap<K, V>` hashing keys with [`MixState`].
    pub fn build_coarse<K, V>(self) -> Result<CoarseMap<K, V, MixState>>
    where
        K: Hash + Eq,
    {
        self.build_coarse_with_hasher(MixState)
    }

    /// Builds a `CoarseMap<K, V, S>`, with the given `hasher`.
    pub fn build_coarse_with_hasher<K, V, S>(self, hasher: S) -> Result<CoarseMap<K, V, S>>
    where
        K: Hash + Eq,
        S: BuildHasher,
    {
        log::debug!(
            "building coarse table: {} buckets, {:?}",
            self.initial_capacity,
            self.policy
        );
        CoarseMap::build(self.initial_capacity, self.growth(), hasher)
    }

    /// Builds a `LockFreeMap<K, V>` hashing keys with [`MixState`].
    ///
    /// The bucket count is final: an elastic lock-free table lets its chains
    /// grow instead of resizing.
    pub fn build_lock_free<K, V>(self) -> Result<LockFreeMap<K, V, MixState>>
    where
        K: Hash + Eq,
    {
        self.build_lock_free_with_hasher(MixState)
    }

    /// Builds a `LockFreeMap<K, V, S>`, with the given `hasher`.
    pub fn build_lock_free_with_hasher<K, V, S>(self, hasher: S) -> Result<LockFreeMap<K, V, S>>
    where
        K: Hash + Eq,
        S: BuildHasher,
    {
        log::debug!(
            "building lock-free table: {} buckets, {:?}",
            self.initial_capacity,
            self.policy
        );
        LockFreeMap::build(self.initial_capacity, self.growth(), hasher)
    }
}
