use bucketmap::{CoarseMap, ConcurrentMap, LockFreeMap, StripedHashMap, TableBuilder};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Instant;

const NUM_BUCKETS: usize = 100;
const NUM_PAIRS: usize = 2_000_000;
const NUM_THREADS: usize = 8;
// Lock-free tables never resize, so they start out sized for the input.
const LOCK_FREE_BUCKETS: usize = NUM_PAIRS;

macro_rules! bench {
    ($name: expr, $body: expr) => {
        let now = Instant::now();
        $body;
        let elapsed = now.elapsed();
        println!("{} elapsed: {:.2?}", $name, elapsed);
    };
}

/// `DashMap` behind the same two-operation interface.
struct DashTable(DashMap<i64, i64>);

impl ConcurrentMap for DashTable {
    type Key = i64;
    type Val = i64;

    fn get(&self, key: &i64) -> Option<i64> {
        self.0.get(key).map(|v| *v)
    }

    fn contains(&self, key: &i64) -> bool {
        self.0.contains_key(key)
    }

    fn put(&self, key: i64, value: i64) -> bucketmap::Result<()> {
        self.0.insert(key, value);
        Ok(())
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn capacity(&self) -> usize {
        self.0.capacity()
    }
}

fn striped() -> StripedHashMap<i64, i64> {
    StripedHashMap::with_num_buckets(NUM_BUCKETS)
}

fn coarse() -> CoarseMap<i64, i64> {
    match TableBuilder::new(NUM_BUCKETS).build_coarse() {
        Ok(map) => map,
        Err(e) => panic!("cannot build coarse table: {e}"),
    }
}

fn lock_free() -> LockFreeMap<i64, i64> {
    match TableBuilder::new(LOCK_FREE_BUCKETS).build_lock_free() {
        Ok(map) => map,
        Err(e) => panic!("cannot build lock-free table: {e}"),
    }
}

fn dash() -> DashTable {
    DashTable(DashMap::new())
}

fn make_random_pairs(n: usize) -> Vec<(i64, i64)> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| (rng.gen(), rng.gen())).collect()
}

fn partition_data<T>(data: Vec<T>, num_partitions: usize) -> Vec<Vec<T>> {
    match num_partitions {
        0 => unimplemented!(),
        1 => vec![data],
        n => {
            let partition_sz = data.len() / n;
            let mut out = Vec::new();
            let mut c = 0;
            let mut buf = Vec::new();
            for item in data {
                buf.push(item);
                c += 1;
                if c == partition_sz {
                    c = 0;
                    out.push(buf);
                    buf = Vec::new();
                }
            }
            if !buf.is_empty() {
                out.push(buf);
            }
            out
        }
    }
}

/// Reads every key of `src` back with `get`. Returns how many were found.
fn read_back<M>(map: &M, src: &[(i64, i64)]) -> usize
where
    M: ConcurrentMap<Key = i64, Val = i64> + ?Sized,
{
    src.iter()
        .filter(|(key, _)| std::hint::black_box(map.get(key)).is_some())
        .count()
}

fn bench_single_threaded<M: ConcurrentMap<Key = i64, Val = i64>>(
    name: &str,
    map: M,
    src: &[(i64, i64)],
) {
    bench!(format!("{name} put"), {
        for &(key, val) in src {
            if let Err(e) = map.put(key, val) {
                log::error!("{name}: put failed: {e}");
            }
        }
    });
    bench!(format!("{name} get"), {
        let hits = read_back(&map, src);
        log::debug!("{name}: {hits} of {} reads hit", src.len());
    });
    log::info!("{name}: {} entries in {} buckets", map.len(), map.capacity());
}

fn bench_multi_threaded<M>(name: &str, map: M, num_threads: usize, src: &[(i64, i64)])
where
    M: ConcurrentMap<Key = i64, Val = i64> + Send + Sync + 'static,
{
    let thread_data = partition_data(src.to_vec(), num_threads);
    let map = Arc::new(map);
    let start_barr = Arc::new(Barrier::new(thread_data.len() + 1));
    let end_barr = Arc::new(Barrier::new(thread_data.len() + 1));

    let mut handles = Vec::new();
    for data in thread_data {
        let tmap = Arc::clone(&map);
        let t_start_barr = Arc::clone(&start_barr);
        let t_end_barr = Arc::clone(&end_barr);
        handles.push(thread::spawn(move || {
            t_start_barr.wait();
            for &(key, val) in &data {
                if let Err(e) = tmap.put(key, val) {
                    log::error!("put failed: {e}");
                }
            }
            read_back(&*tmap, &data);
            t_end_barr.wait();
        }));
    }

    start_barr.wait();
    let now = Instant::now();
    end_barr.wait();
    let elapsed = now.elapsed();
    println!("{name} multithreaded elapsed: {:.2?}", elapsed);

    for h in handles {
        if h.join().is_err() {
            log::error!("{name}: worker panicked");
        }
    }
    log::info!("{name}: {} entries in {} buckets", map.len(), map.capacity());
}

fn main() {
    env_logger::init();

    let input = make_random_pairs(NUM_PAIRS);

    println!("bench single threaded");
    bench_single_threaded("StripedHashMap", striped(), &input);
    bench_single_threaded("CoarseMap", coarse(), &input);
    bench_single_threaded("LockFreeMap", lock_free(), &input);
    bench_single_threaded("DashMap", dash(), &input);

    println!("bench multi threaded");
    bench_multi_threaded("StripedHashMap", striped(), NUM_THREADS, &input);
    bench_multi_threaded("CoarseMap", coarse(), NUM_THREADS, &input);
    bench_multi_threaded("LockFreeMap", lock_free(), NUM_THREADS, &input);
    bench_multi_threaded("DashMap", dash(), NUM_THREADS, &input);
}
