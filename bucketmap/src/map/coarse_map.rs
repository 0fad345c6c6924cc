use super::bucket::{self, Bucket, Slot};
use super::ConcurrentMap;
use crate::error::{Error, Result};
use crate::hash::{self, MixState};
use crate::policy::{CapacityPolicy, GrowthPolicy};

use parking_lot::Mutex;
use std::hash::{BuildHasher, Hash};

struct Chains<K, V> {
    buckets: Vec<Bucket<K, V>>,
    size: usize,
    resizes: usize,
}

/// A concurrent hash table implemented with coarse-grained locking.
///
/// Every operation, resizes included, runs under one table-wide mutex. It
/// shares hashing, chaining and growth rules with
/// [`StripedHashMap`][striped] and serves as the baseline it is measured
/// against.
///
/// [striped]: ./struct.StripedHashMap.html
pub struct CoarseMap<K, V, S = MixState> {
    chains: Mutex<Chains<K, V>>,
    growth: GrowthPolicy,
    state: S,
}

impl<K, V, S> CoarseMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub(crate) fn build(num_buckets: usize, growth: GrowthPolicy, hasher: S) -> Result<Self> {
        let buckets = bucket::alloc_buckets(num_buckets, Vec::new)?;
        Ok(CoarseMap {
            chains: Mutex::new(Chains {
                buckets,
                size: 0,
                resizes: 0,
            }),
            growth,
            state: hasher,
        })
    }

    fn hash(&self, key: &K) -> u64 {
        hash::hash_key(&self.state, key)
    }

    pub fn load_factor(&self) -> f64 {
        let chains = self.chains.lock();
        chains.size as f64 / chains.buckets.len() as f64
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.growth.policy()
    }

    pub fn max_load_factor(&self) -> usize {
        self.growth.max_load_factor()
    }

    pub fn resize_count(&self) -> usize {
        self.chains.lock().resizes
    }

    fn resize(&self, chains: &mut Chains<K, V>) -> Result<()> {
        let old_len = chains.buckets.len();
        let new_len = bucket::doubled(old_len)?;
        log::debug!(
            "resizing directory from {old_len} to {new_len} buckets ({} entries)",
            chains.size
        );
        let mut grown = bucket::alloc_buckets(new_len, Vec::new).map_err(|e| {
            log::error!("resize to {new_len} buckets failed: {e}");
            e
        })?;

        for old_bucket in chains.buckets.iter_mut() {
            for (key, value) in old_bucket.drain(..) {
                let idx = hash::index(self.hash(&key), new_len);
                bucket::upsert(&mut grown[idx], key, value);
            }
        }

        chains.buckets = grown;
        chains.resizes += 1;
        Ok(())
    }
}

impl<K, V, S> ConcurrentMap for CoarseMap<K, V, S>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    type Key = K;
    type Val = V;

    fn get(&self, key: &K) -> Option<V> {
        let hash = self.hash(key);
        let chains = self.chains.lock();
        let idx = hash::index(hash, chains.buckets.len());
        bucket::lookup(&chains.buckets[idx], key).cloned()
    }

    fn contains(&self, key: &K) -> bool {
        let hash = self.hash(key);
        let chains = self.chains.lock();
        let idx = hash::index(hash, chains.buckets.len());
        bucket::lookup(&chains.buckets[idx], key).is_some()
    }

    fn put(&self, key: K, value: V) -> Result<()> {
        let hash = self.hash(&key);
        let mut guard = self.chains.lock();
        let chains = &mut *guard;
        if self.growth.should_grow(chains.size, chains.buckets.len()) {
            self.resize(chains)?;
        }

        let capacity = chains.buckets.len();
        let idx = hash::index(hash, capacity);
        match Slot::find(&mut chains.buckets[idx], &key) {
            Slot::Occupied(slot) => *slot = value,
            Slot::Vacant(bucket) => {
                if !self.growth.admits_new_key(chains.size, capacity) {
                    log::warn!("rejecting new key: all {capacity} slots are occupied");
                    return Err(Error::TableFull { capacity });
                }
                bucket.push((key, value));
                chains.size += 1;
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.chains.lock().size
    }

    fn capacity(&self) -> usize {
        self.chains.lock().buckets.len()
    }
}
