//! Behaviour shared by every locking discipline.

use bucketmap::hash::{IdentityState, MixState};
use bucketmap::{ConcurrentMap, Error, TableBuilder};
use quickcheck_macros::quickcheck;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Barrier};
use std::thread;

type Table = Arc<dyn ConcurrentMap<Key = i64, Val = i64> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Locking {
    Striped,
    Coarse,
    LockFree,
}

const ALL: [Locking; 3] = [Locking::Striped, Locking::Coarse, Locking::LockFree];

/// The disciplines that double their directory.
const RESIZING: [Locking; 2] = [Locking::Striped, Locking::Coarse];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn identity_table(locking: Locking, builder: TableBuilder) -> Table {
    match locking {
        Locking::Striped => Arc::new(
            builder
                .build_with_hasher::<i64, i64, _>(IdentityState)
                .unwrap(),
        ),
        Locking::Coarse => Arc::new(
            builder
                .build_coarse_with_hasher::<i64, i64, _>(IdentityState)
                .unwrap(),
        ),
        Locking::LockFree => Arc::new(
            builder
                .build_lock_free_with_hasher::<i64, i64, _>(IdentityState)
                .unwrap(),
        ),
    }
}

fn mixed_table(locking: Locking, builder: TableBuilder) -> Table {
    match locking {
        Locking::Striped => Arc::new(
            builder
                .build_with_hasher::<i64, i64, _>(MixState)
                .unwrap(),
        ),
        Locking::Coarse => Arc::new(
            builder
                .build_coarse_with_hasher::<i64, i64, _>(MixState)
                .unwrap(),
        ),
        Locking::LockFree => Arc::new(
            builder
                .build_lock_free_with_hasher::<i64, i64, _>(MixState)
                .unwrap(),
        ),
    }
}

fn last_writes(ops: &[(i64, i64)]) -> HashMap<i64, i64> {
    ops.iter().copied().collect()
}

#[quickcheck]
fn round_trip(ops: Vec<(i64, i64)>) -> bool {
    ALL.iter().all(|&locking| {
        let table = mixed_table(locking, TableBuilder::new(4));
        for &(k, v) in &ops {
            table.put(k, v).unwrap();
        }
        let model = last_writes(&ops);
        table.len() == model.len() && model.iter().all(|(k, v)| table.get(k) == Some(*v))
    })
}

#[quickcheck]
fn never_inserted_keys_miss(keys: HashSet<i64>, missing: i64) -> bool {
    ALL.iter().all(|&locking| {
        let table = identity_table(locking, TableBuilder::new(3));
        for &k in &keys {
            table.put(k, k).unwrap();
        }
        keys.contains(&missing) || (table.get(&missing).is_none() && !table.contains(&missing))
    })
}

#[test]
fn overwrite_counts_once() {
    for locking in ALL {
        let table = identity_table(locking, TableBuilder::new(8));
        assert!(table.is_empty());
        table.put(5, 1).unwrap();
        table.put(5, 2).unwrap();
        assert_eq!(table.get(&5), Some(2), "{locking:?}");
        assert_eq!(table.len(), 1, "{locking:?}");
    }
}

#[test]
fn no_lost_updates_in_one_bucket() {
    init_logger();
    const WRITERS: usize = 32;
    const BUCKETS: usize = 1024;

    for locking in ALL {
        let table = identity_table(locking, TableBuilder::new(BUCKETS));
        let barrier = Arc::new(Barrier::new(WRITERS));

        // Every key is a multiple of the bucket count, so all of them
        // collide in bucket 0.
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let table = Arc::clone(&table);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let key = (i * BUCKETS) as i64;
                    table.put(key, i as i64).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(table.len(), WRITERS, "{locking:?}");
        assert_eq!(table.capacity(), BUCKETS, "{locking:?}");
        for i in 0..WRITERS {
            assert_eq!(table.get(&((i * BUCKETS) as i64)), Some(i as i64));
        }
    }
}

#[test]
fn no_duplicates_for_one_key() {
    init_logger();
    const WRITERS: i64 = 16;
    const ROUNDS: i64 = 200;

    for locking in ALL {
        let table = mixed_table(locking, TableBuilder::new(1));
        let barrier = Arc::new(Barrier::new(WRITERS as usize));

        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let table = Arc::clone(&table);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for r in 0..ROUNDS {
                        table.put(42, w * ROUNDS + r).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(table.len(), 1, "{locking:?}");
        let value = table.get(&42).unwrap();
        // Whoever wrote last left one of its final values.
        assert!((0..WRITERS).any(|w| value == w * ROUNDS + ROUNDS - 1));
    }
}

#[test]
fn resize_preserves_content() {
    init_logger();
    for locking in ALL {
        let table = mixed_table(locking, TableBuilder::new(2));
        for k in -500..500 {
            table.put(k, k).unwrap();
        }
        for k in (-500..500).step_by(2) {
            table.put(k, -k).unwrap();
        }

        assert_eq!(table.len(), 1000, "{locking:?}");
        if RESIZING.contains(&locking) {
            assert!(table.capacity() >= 1000, "{locking:?}");
        } else {
            assert_eq!(table.capacity(), 2, "{locking:?}");
        }
        for k in -500..500 {
            let expected = if k % 2 == 0 { -k } else { k };
            assert_eq!(table.get(&k), Some(expected), "{locking:?} key {k}");
        }
    }
}

#[test]
fn readers_never_miss_during_resizes() {
    init_logger();
    const PRELOADED: i64 = 256;
    const WRITERS: i64 = 4;
    const READERS: i64 = 4;
    const PER_WRITER: i64 = 4_000;

    for locking in ALL {
        let table = mixed_table(locking, TableBuilder::new(PRELOADED as usize * 2));
        for k in 0..PRELOADED {
            table.put(k, k * 3).unwrap();
        }
        let barrier = Arc::new(Barrier::new((WRITERS + READERS) as usize));

        let mut handles = Vec::new();
        for w in 0..WRITERS {
            let table = Arc::clone(&table);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_WRITER {
                    let key = PRELOADED + w * PER_WRITER + i;
                    table.put(key, key * 3).unwrap();
                }
            }));
        }
        for _ in 0..READERS {
            let table = Arc::clone(&table);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for round in 0..20 {
                    for k in 0..PRELOADED {
                        assert_eq!(table.get(&k), Some(k * 3), "round {round}");
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let total = PRELOADED + WRITERS * PER_WRITER;
        assert_eq!(table.len(), total as usize, "{locking:?}");
        for k in 0..total {
            assert_eq!(table.get(&k), Some(k * 3));
        }
    }
}

#[test]
fn fixed_capacity_saturation() {
    for locking in ALL {
        let table = mixed_table(locking, TableBuilder::new(16).fixed());
        for k in 0..16 {
            table.put(k * 7, k).unwrap();
        }

        match table.put(1_000, 0) {
            Err(Error::TableFull { capacity }) => assert_eq!(capacity, 16),
            other => panic!("{locking:?}: expected TableFull, got {other:?}"),
        }
        table.put(7, 700).unwrap();

        assert_eq!(table.get(&7), Some(700));
        assert_eq!(table.get(&1_000), None);
        assert_eq!(table.len(), 16);
        assert_eq!(table.capacity(), 16);
    }
}

#[test]
fn fixed_capacity_under_contention() {
    const THREADS: i64 = 8;
    const CAPACITY: usize = 64;

    for locking in ALL {
        let table = mixed_table(locking, TableBuilder::new(CAPACITY).fixed());
        let barrier = Arc::new(Barrier::new(THREADS as usize));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let table = Arc::clone(&table);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (0..32)
                        .filter(|i| table.put(t * 32 + i, *i).is_ok())
                        .count()
                })
            })
            .collect();
        let inserted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(inserted, CAPACITY, "{locking:?}");
        assert_eq!(table.len(), CAPACITY, "{locking:?}");
    }
}

#[test]
fn capacity_eight_scenario() {
    for locking in RESIZING {
        let table = identity_table(locking, TableBuilder::new(8).elastic());
        for k in 1..=8 {
            table.put(k, k * 10).unwrap();
        }
        assert_eq!(table.len(), 8);
        assert_eq!(table.capacity(), 8, "{locking:?}");

        table.put(9, 90).unwrap();
        assert_eq!(table.capacity(), 16, "{locking:?}");
        for k in 1..=9 {
            assert_eq!(table.get(&k), Some(k * 10), "{locking:?} key {k}");
        }
    }
}

#[test]
fn lock_free_capacity_eight_scenario() {
    let table = identity_table(Locking::LockFree, TableBuilder::new(8).elastic());
    for k in 1..=9 {
        table.put(k, k * 10).unwrap();
    }
    assert_eq!(table.len(), 9);
    assert_eq!(table.capacity(), 8);
    for k in 1..=9 {
        assert_eq!(table.get(&k), Some(k * 10), "key {k}");
    }
}
