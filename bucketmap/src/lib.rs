//! Concurrent, resizable hash tables with pluggable lock granularity.
//!
//! [`StripedHashMap`] guards each bucket with its own reader/writer lock and
//! doubles its directory once the table averages one entry per bucket.
//! [`CoarseMap`] runs the same algorithm under a single table-wide lock.
//! [`LockFreeMap`] keeps a fixed array of lock-free linked lists and
//! reclaims memory with `crossbeam::epoch`. All three implement
//! [`ConcurrentMap`].
//!
//! ```rust
//! use bucketmap::{ConcurrentMap, StripedHashMap};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let table = Arc::new(StripedHashMap::with_num_buckets(8));
//!
//! let handles: Vec<_> = (0..4i64)
//!     .map(|t| {
//!         let table = Arc::clone(&table);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 table.put(t * 100 + i, i).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(table.len(), 400);
//! assert_eq!(table.get(&301), Some(1));
//! assert_eq!(table.get(&1_000), None);
//! ```

mod builder;
mod error;
pub mod hash;
mod map;
mod policy;
pub mod protocol;

pub use builder::TableBuilder;
pub use error::{Error, Result};
pub use map::{CoarseMap, ConcurrentMap, LockFreeMap, StripedHashMap};
pub use policy::{CapacityPolicy, GrowthPolicy, DEFAULT_MAX_LOAD_FACTOR};
