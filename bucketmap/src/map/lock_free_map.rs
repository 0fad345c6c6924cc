use super::bucket;
use super::ConcurrentMap;
use crate::error::{Error, Result};
use crate::hash::{self, MixState};
use crate::policy::{CapacityPolicy, GrowthPolicy};

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use crossbeam::utils::CachePadded;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

struct Node<K, V> {
    key: K,
    value: Atomic<V>,
    next: Atomic<Node<K, V>>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Self {
        Node {
            key,
            value: Atomic::new(value),
            next: Atomic::null(),
        }
    }
}

impl<K, V> Drop for Node<K, V> {
    fn drop(&mut self) {
        // Nodes are never unlinked, so a node is only dropped by its owner
        // (the table's destructor or a `put` that never published it).
        unsafe {
            let value = self.value.load(Ordering::Relaxed, epoch::unprotected());
            if !value.is_null() {
                drop(value.into_owned());
            }
        }
    }
}

/// A concurrent hash table whose buckets are lock-free linked lists.
///
/// New keys are pushed onto the head of their bucket's list with a single
/// compare-and-swap, and updates swap the value pointer of the existing
/// node. Replaced values are reclaimed through `crossbeam::epoch` once no
/// pinned reader can still see them. No operation ever blocks.
///
/// The bucket array is allocated once and never resized: in elastic mode
/// the chains simply grow longer, in fixed mode new keys are refused once
/// `len() == capacity()`.
pub struct LockFreeMap<K, V, S = MixState> {
    buckets: Box<[Atomic<Node<K, V>>]>,
    size: CachePadded<AtomicUsize>,
    overloaded: AtomicBool,
    growth: GrowthPolicy,
    state: S,
}

impl<K, V, S> LockFreeMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub(crate) fn build(num_buckets: usize, growth: GrowthPolicy, hasher: S) -> Result<Self> {
        let buckets = bucket::alloc_buckets(num_buckets, Atomic::null)?;
        Ok(LockFreeMap {
            buckets: buckets.into_boxed_slice(),
            size: CachePadded::new(AtomicUsize::new(0)),
            overloaded: AtomicBool::new(false),
            growth,
            state: hasher,
        })
    }

    fn bucket(&self, key: &K) -> &Atomic<Node<K, V>> {
        let hash = hash::hash_key(&self.state, key);
        &self.buckets[hash::index(hash, self.buckets.len())]
    }

    /// Average number of entries per bucket.
    pub fn load_factor(&self) -> f64 {
        self.size.load(Ordering::Acquire) as f64 / self.buckets.len() as f64
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.growth.policy()
    }

    pub fn max_load_factor(&self) -> usize {
        self.growth.max_load_factor()
    }

    /// Walks the list starting at `cur` looking for `key`.
    fn find<'g>(
        mut cur: Shared<'g, Node<K, V>>,
        key: &K,
        guard: &'g Guard,
    ) -> Option<&'g Node<K, V>> {
        // Published nodes stay linked until the table is dropped.
        while let Some(node) = unsafe { cur.as_ref() } {
            if node.key == *key {
                return Some(node);
            }
            cur = node.next.load(Ordering::Acquire, guard);
        }
        None
    }

    fn reserve_slot(&self) -> Result<()> {
        let capacity = self.buckets.len();
        let size = self
            .size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |size| {
                self.growth
                    .admits_new_key(size, capacity)
                    .then_some(size + 1)
            })
            .map_err(|_| {
                log::warn!("rejecting new key: all {capacity} slots are occupied");
                Error::TableFull { capacity }
            })?;

        if self.growth.should_grow(size + 1, capacity)
            && !self.overloaded.swap(true, Ordering::Relaxed)
        {
            log::warn!(
                "{} entries in {capacity} buckets exceed the load factor, chains will keep growing",
                size + 1
            );
        }
        Ok(())
    }
}

impl<K, V, S> ConcurrentMap for LockFreeMap<K, V, S>
where
    K: Hash + Eq,
    V: Clone + Send + 'static,
    S: BuildHasher,
{
    type Key = K;
    type Val = V;

    fn get(&self, key: &K) -> Option<V> {
        let guard = epoch::pin();
        let first = self.bucket(key).load(Ordering::Acquire, &guard);
        let node = Self::find(first, key, &guard)?;
        let value = node.value.load(Ordering::Acquire, &guard);
        unsafe { value.as_ref() }.cloned()
    }

    fn contains(&self, key: &K) -> bool {
        let guard = epoch::pin();
        let first = self.bucket(key).load(Ordering::Acquire, &guard);
        Self::find(first, key, &guard).is_some()
    }

    fn put(&self, key: K, value: V) -> Result<()> {
        let guard = epoch::pin();
        let bucket = self.bucket(&key);
        let mut node = Owned::new(Node::new(key, value));
        let mut first = bucket.load(Ordering::Acquire, &guard);
        let mut reserved = false;

        loop {
            if let Some(existing) = Self::find(first, &node.key, &guard) {
                if reserved {
                    self.size.fetch_sub(1, Ordering::AcqRel);
                }
                let value = node.value.swap(Shared::null(), Ordering::Relaxed, &guard);
                let old = existing.value.swap(value, Ordering::AcqRel, &guard);
                // Readers pinned before the swap may still be cloning `old`.
                unsafe { guard.defer_destroy(old) };
                return Ok(());
            }

            if !reserved {
                if let Err(e) = self.reserve_slot() {
                    // Lists only grow at the head: an unchanged head means
                    // the key is still absent.
                    let latest = bucket.load(Ordering::Acquire, &guard);
                    if latest == first {
                        return Err(e);
                    }
                    first = latest;
                    continue;
                }
                reserved = true;
            }

            node.next.store(first, Ordering::Relaxed);
            match bucket.compare_exchange(
                first,
                node,
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => return Ok(()),
                Err(e) => {
                    log::trace!("lost the race for a bucket head, rescanning");
                    first = e.current;
                    node = e.new;
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }
}

impl<K, V, S> Drop for LockFreeMap<K, V, S> {
    fn drop(&mut self) {
        // `&mut self` rules out concurrent readers.
        let guard = unsafe { epoch::unprotected() };
        for bucket in self.buckets.iter() {
            let mut cur = bucket.load(Ordering::Relaxed, guard);
            while !cur.is_null() {
                let node = unsafe { cur.into_owned() };
                cur = node.next.load(Ordering::Relaxed, guard);
                drop(node);
            }
        }
    }
}
