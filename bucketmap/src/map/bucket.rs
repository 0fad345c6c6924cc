//! Chains of entries shared by the striped and coarse tables.

use crate::error::{Error, Result};

/// An unordered chain holding at most one entry per key.
pub(crate) type Bucket<K, V> = Vec<(K, V)>;

pub(crate) enum Slot<'a, K, V> {
    Occupied(&'a mut V),
    Vacant(&'a mut Bucket<K, V>),
}

impl<'a, K, V> Slot<'a, K, V> {
    /// Locates `key` in `bucket`.
    pub(crate) fn find(bucket: &'a mut Bucket<K, V>, key: &K) -> Self
    where
        K: PartialEq,
    {
        match bucket.iter().position(|(k, _)| k == key) {
            Some(i) => Slot::Occupied(&mut bucket[i].1),
            None => Slot::Vacant(bucket),
        }
    }
}

pub(crate) fn lookup<'a, K: PartialEq, V>(bucket: &'a [(K, V)], key: &K) -> Option<&'a V> {
    bucket.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Inserts or overwrites. Returns `true` if a new entry was appended.
pub(crate) fn upsert<K: PartialEq, V>(bucket: &mut Bucket<K, V>, key: K, value: V) -> bool {
    match Slot::find(bucket, &key) {
        Slot::Occupied(slot) => {
            *slot = value;
            false
        }
        Slot::Vacant(bucket) => {
            bucket.push((key, value));
            true
        }
    }
}

/// Allocates `capacity` fresh buckets, reporting allocation failure instead
/// of aborting.
pub(crate) fn alloc_buckets<T>(capacity: usize, make: impl FnMut() -> T) -> Result<Vec<T>> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|source| Error::AllocationFailed { capacity, source })?;
    buckets.extend(std::iter::repeat_with(make).take(capacity));
    Ok(buckets)
}

pub(crate) fn doubled(capacity: usize) -> Result<usize> {
    capacity
        .checked_mul(2)
        .ok_or(Error::CapacityOverflow { capacity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keeps_keys_unique() {
        let mut bucket = Bucket::new();
        assert!(upsert(&mut bucket, 1, 10));
        assert!(upsert(&mut bucket, 2, 20));
        assert!(!upsert(&mut bucket, 1, 11));
        assert_eq!(bucket.len(), 2);
        assert_eq!(lookup(&bucket, &1), Some(&11));
        assert_eq!(lookup(&bucket, &2), Some(&20));
        assert_eq!(lookup(&bucket, &3), None);
    }

    #[test]
    fn slot_vacant_then_occupied() {
        let mut bucket: Bucket<i64, i64> = vec![(4, 40)];
        assert!(matches!(Slot::find(&mut bucket, &5), Slot::Vacant(_)));
        match Slot::find(&mut bucket, &4) {
            Slot::Occupied(v) => *v = 41,
            Slot::Vacant(_) => panic!("key 4 is present"),
        }
        assert_eq!(bucket, vec![(4, 41)]);
    }

    #[test]
    fn alloc_and_double() {
        let buckets: Vec<Bucket<i64, i64>> = alloc_buckets(16, Vec::new).unwrap();
        assert_eq!(buckets.len(), 16);
        assert!(buckets.iter().all(|b| b.is_empty()));
        assert_eq!(doubled(8).unwrap(), 16);
        assert!(matches!(
            doubled(usize::MAX),
            Err(Error::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn alloc_failure_is_reported() {
        let err = alloc_buckets::<Bucket<i64, i64>>(usize::MAX, Vec::new).unwrap_err();
        assert!(matches!(err, Error::AllocationFailed { .. }));
    }
}
