use std::collections::TryReserveError;

/// Errors reported by [`ConcurrentMap::put`][put].
///
/// A lookup miss is not an error; [`ConcurrentMap::get`][get] reports it as
/// `None`.
///
/// [put]: ./trait.ConcurrentMap.html#tymethod.put
/// [get]: ./trait.ConcurrentMap.html#tymethod.get
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A fixed-capacity table already holds `capacity` entries and the key
    /// being inserted is new. Updates to existing keys never fail this way.
    #[error("table is full: all {capacity} slots are occupied and growth is disabled")]
    TableFull { capacity: usize },

    /// Doubling the directory would overflow `usize`.
    #[error("cannot grow the directory beyond {capacity} buckets")]
    CapacityOverflow { capacity: usize },

    /// The replacement directory could not be allocated. The previous
    /// directory is still in effect and holds every entry.
    #[error("failed to allocate a directory of {capacity} buckets")]
    AllocationFailed {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },
}

impl Error {
    /// Returns `true` if this is the fixed-capacity saturation error.
    pub fn is_table_full(&self) -> bool {
        matches!(self, Error::TableFull { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
