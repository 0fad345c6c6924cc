/// Default average number of entries per bucket at which an elastic table
/// doubles its directory.
pub const DEFAULT_MAX_LOAD_FACTOR: usize = 1;

/// Whether a table grows or refuses new keys once it fills up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    /// The directory doubles whenever the load factor reaches the
    /// threshold. `put` never fails for lack of room.
    #[default]
    Elastic,
    /// The directory never grows. Once `len() == capacity()` a `put` of a
    /// new key fails with [`Error::TableFull`][full]; updates still succeed.
    ///
    /// [full]: ./enum.Error.html#variant.TableFull
    Fixed,
}

/// The capacity policy together with the growth threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    policy: CapacityPolicy,
    max_load_factor: usize,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::new(CapacityPolicy::default(), DEFAULT_MAX_LOAD_FACTOR)
    }
}

impl GrowthPolicy {
    /// # Panics
    ///
    /// Panics if `max_load_factor` is zero.
    pub fn new(policy: CapacityPolicy, max_load_factor: usize) -> Self {
        assert!(max_load_factor > 0, "max_load_factor must be positive");
        Self {
            policy,
            max_load_factor,
        }
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.policy
    }

    pub fn max_load_factor(&self) -> usize {
        self.max_load_factor
    }

    /// Returns `true` when a table holding `size` entries in `capacity`
    /// buckets is due for a resize. Always `false` for fixed tables.
    pub fn should_grow(&self, size: usize, capacity: usize) -> bool {
        match self.policy {
            CapacityPolicy::Elastic => size >= capacity.saturating_mul(self.max_load_factor),
            CapacityPolicy::Fixed => false,
        }
    }

    /// Returns `true` if one more distinct key fits.
    pub fn admits_new_key(&self, size: usize, capacity: usize) -> bool {
        match self.policy {
            CapacityPolicy::Elastic => true,
            CapacityPolicy::Fixed => size < capacity,
        }
    }
}
