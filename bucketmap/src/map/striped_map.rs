use super::bucket::{self, Bucket, Slot};
use super::ConcurrentMap;
use crate::builder::TableBuilder;
use crate::error::{Error, Result};
use crate::hash::{self, MixState};
use crate::policy::{CapacityPolicy, GrowthPolicy};

use crossbeam::utils::CachePadded;
use parking_lot::{RwLock, RwLockReadGuard};
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_NUM_BUCKETS: usize = 16;

type ProtectedBucket<K, V> = RwLock<Bucket<K, V>>;

/// The buckets in effect for one capacity. Replaced wholesale on resize.
struct Directory<K, V> {
    buckets: Vec<ProtectedBucket<K, V>>,
}

impl<K, V> Directory<K, V> {
    fn with_num_buckets(num_buckets: usize) -> Result<Self> {
        let buckets = bucket::alloc_buckets(num_buckets, || RwLock::new(Vec::new()))?;
        Ok(Directory { buckets })
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, hash: u64) -> &ProtectedBucket<K, V> {
        &self.buckets[hash::index(hash, self.len())]
    }
}

/// A concurrent hash table with one reader/writer lock per bucket.
///
/// Lookups take the bucket's lock in shared mode and updates take it in
/// exclusive mode, so operations on different buckets never wait on each
/// other. The directory itself sits behind a table-wide reader/writer lock:
/// every `get`/`put` holds it shared for the duration of the call, and a
/// resize holds it exclusively while it builds a doubled directory and
/// swaps it in. No operation can observe a half-populated directory.
pub struct StripedHashMap<K, V, S = MixState> {
    directory: RwLock<Directory<K, V>>,
    size: CachePadded<AtomicUsize>,
    resizes: AtomicUsize,
    growth: GrowthPolicy,
    state: S,
}

impl<K, V> Default for StripedHashMap<K, V, MixState>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StripedHashMap<K, V, MixState>
where
    K: Hash + Eq,
{
    /// Creates an elastic table with the default number of buckets.
    pub fn new() -> Self {
        Self::with_num_buckets(DEFAULT_NUM_BUCKETS)
    }

    /// Creates an elastic table with `num_buckets` initial buckets.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be allocated. Use
    /// [`TableBuilder::build`] to handle that case.
    pub fn with_num_buckets(num_buckets: usize) -> Self {
        match TableBuilder::new(num_buckets).build() {
            Ok(map) => map,
            Err(e) => panic!("cannot allocate {num_buckets} buckets: {e}"),
        }
    }
}

impl<K, V, S> StripedHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub(crate) fn build(num_buckets: usize, growth: GrowthPolicy, hasher: S) -> Result<Self> {
        Ok(StripedHashMap {
            directory: RwLock::new(Directory::with_num_buckets(num_buckets)?),
            size: CachePadded::new(AtomicUsize::new(0)),
            resizes: AtomicUsize::new(0),
            growth,
            state: hasher,
        })
    }

    fn hash(&self, key: &K) -> u64 {
        hash::hash_key(&self.state, key)
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn num_buckets(&self) -> usize {
        self.directory.read().len()
    }

    /// Average number of entries per bucket.
    pub fn load_factor(&self) -> f64 {
        self.size() as f64 / self.num_buckets() as f64
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.growth.policy()
    }

    pub fn max_load_factor(&self) -> usize {
        self.growth.max_load_factor()
    }

    /// Number of times the directory has been doubled.
    pub fn resize_count(&self) -> usize {
        self.resizes.load(Ordering::Relaxed)
    }

    /// Returns the directory in effect, doubling it first if the table is
    /// due for growth.
    fn current_directory(&self) -> Result<RwLockReadGuard<'_, Directory<K, V>>> {
        let directory = self.directory.read();
        if !self.growth.should_grow(self.size(), directory.len()) {
            return Ok(directory);
        }
        drop(directory);
        self.resize()?;
        Ok(self.directory.read())
    }

    fn resize(&self) -> Result<()> {
        let mut directory = self.directory.write();
        let old_len = directory.len();

        // Another writer may have grown the directory while we waited.
        if !self.growth.should_grow(self.size(), old_len) {
            log::trace!("directory already resized to {old_len} buckets");
            return Ok(());
        }

        let new_len = bucket::doubled(old_len)?;
        self.rehash_into(&mut directory, new_len)
    }

    /// Moves every entry of `directory` into a fresh one of `new_len`
    /// buckets. The new directory is allocated before any entry moves, so
    /// on error `directory` is left exactly as it was.
    fn rehash_into(&self, directory: &mut Directory<K, V>, new_len: usize) -> Result<()> {
        log::debug!(
            "resizing directory from {} to {new_len} buckets ({} entries)",
            directory.len(),
            self.size()
        );
        let mut grown = Directory::with_num_buckets(new_len).map_err(|e| {
            log::error!("resize to {new_len} buckets failed: {e}");
            e
        })?;

        // The exclusive guard flushes out every in-flight reader and writer,
        // so the old buckets can be drained without taking their locks.
        let mut moved = 0;
        for old_bucket in directory.buckets.iter_mut() {
            for (key, value) in old_bucket.get_mut().drain(..) {
                let idx = hash::index(self.hash(&key), new_len);
                if bucket::upsert(grown.buckets[idx].get_mut(), key, value) {
                    moved += 1;
                }
            }
        }

        *directory = grown;
        self.resizes.fetch_add(1, Ordering::Relaxed);
        log::debug!("resized directory to {new_len} buckets, moved {moved} entries");
        Ok(())
    }

    /// Takes one slot from the occupancy counter, unless a fixed table is
    /// already full.
    fn reserve_slot(&self, capacity: usize) -> Result<()> {
        self.size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |size| {
                self.growth
                    .admits_new_key(size, capacity)
                    .then_some(size + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                log::warn!("rejecting new key: all {capacity} slots are occupied");
                Error::TableFull { capacity }
            })
    }
}

impl<K, V, S> ConcurrentMap for StripedHashMap<K, V, S>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    type Key = K;
    type Val = V;

    fn get(&self, key: &K) -> Option<V> {
        let hash = self.hash(key);
        let directory = self.directory.read();
        let bucket = directory.bucket(hash).read();
        bucket::lookup(bucket.as_slice(), key).cloned()
    }

    fn contains(&self, key: &K) -> bool {
        let hash = self.hash(key);
        let directory = self.directory.read();
        let bucket = directory.bucket(hash).read();
        bucket::lookup(bucket.as_slice(), key).is_some()
    }

    fn put(&self, key: K, value: V) -> Result<()> {
        let hash = self.hash(&key);
        let directory = self.current_directory()?;
        let mut bucket = directory.bucket(hash).write();
        match Slot::find(&mut *bucket, &key) {
            Slot::Occupied(slot) => *slot = value,
            Slot::Vacant(bucket) => {
                self.reserve_slot(directory.len())?;
                bucket.push((key, value));
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.size()
    }

    fn capacity(&self) -> usize {
        self.num_buckets()
    }
}
