//! Tunables for a [`HistoricalCache`](crate::cache::HistoricalCache).
//!
//! ## Defaults
//!
//! | Field                        | Default   | Description                                  |
//! |------------------------------|-----------|----------------------------------------------|
//! | `maximum_size`               | 100       | Initial index capacity (entries)             |
//! | `maximum_size_limit`         | 10,000    | Ceiling for automatic capacity increases     |
//! | `further_values_batch_size`  | 1,000     | Values consumed per ascending read           |
//! | `read_back_step`             | 10 days   | Initial distance read back before a key      |
//! | `successive_miss_threshold`  | 3         | Eviction misses before growing the index     |
//! | `max_cached_window`          | 1,000     | Entries kept in a cached trailing window     |
//! | `query_core`                 | `Cached`  | Range query strategy                         |

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_MAXIMUM_SIZE: usize = 100;
pub const DEFAULT_MAXIMUM_SIZE_LIMIT: usize = 10_000;
pub const DEFAULT_FURTHER_VALUES_BATCH_SIZE: usize = 1_000;
pub const DEFAULT_READ_BACK_STEP: Duration = Duration::from_secs(10 * 24 * 60 * 60);
pub const DEFAULT_SUCCESSIVE_MISS_THRESHOLD: u32 = 3;
pub const DEFAULT_MAX_CACHED_WINDOW: usize = 1_000;

/// How `get_previous_entries` reuses earlier results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryCoreStrategy {
    /// No window; every range query walks the index.
    Default,
    /// One contiguous trailing window with same/incremented/decremented
    /// key handling. Best for monotonically progressing queries.
    #[default]
    Cached,
    /// Like `Cached`, but merges overlapping results into the window.
    /// Best for recursive or jumping access patterns.
    Trailing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalCacheConfig {
    pub maximum_size: usize,
    pub maximum_size_limit: usize,
    pub further_values_batch_size: usize,
    pub read_back_step: Duration,
    pub successive_miss_threshold: u32,
    pub max_cached_window: usize,
    pub query_core: QueryCoreStrategy,
}

impl Default for HistoricalCacheConfig {
    fn default() -> Self {
        Self {
            maximum_size: DEFAULT_MAXIMUM_SIZE,
            maximum_size_limit: DEFAULT_MAXIMUM_SIZE_LIMIT,
            further_values_batch_size: DEFAULT_FURTHER_VALUES_BATCH_SIZE,
            read_back_step: DEFAULT_READ_BACK_STEP,
            successive_miss_threshold: DEFAULT_SUCCESSIVE_MISS_THRESHOLD,
            max_cached_window: DEFAULT_MAX_CACHED_WINDOW,
            query_core: QueryCoreStrategy::default(),
        }
    }
}

impl HistoricalCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maximum_size(mut self, maximum_size: usize) -> Self {
        self.maximum_size = maximum_size;
        self
    }

    pub fn with_maximum_size_limit(mut self, limit: usize) -> Self {
        self.maximum_size_limit = limit;
        self
    }

    pub fn with_further_values_batch_size(mut self, batch: usize) -> Self {
        self.further_values_batch_size = batch;
        self
    }

    pub fn with_read_back_step(mut self, step: Duration) -> Self {
        self.read_back_step = step;
        self
    }

    pub fn with_successive_miss_threshold(mut self, threshold: u32) -> Self {
        self.successive_miss_threshold = threshold;
        self
    }

    pub fn with_max_cached_window(mut self, window: usize) -> Self {
        self.max_cached_window = window;
        self
    }

    pub fn with_query_core(mut self, strategy: QueryCoreStrategy) -> Self {
        self.query_core = strategy;
        self
    }

    /// Checks every field against its documented constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maximum_size_limit == 0 {
            return Err(ConfigError::new("maximum_size_limit must be > 0"));
        }
        if self.maximum_size == 0 {
            return Err(ConfigError::new("maximum_size must be > 0"));
        }
        if self.maximum_size > self.maximum_size_limit {
            return Err(ConfigError::new(format!(
                "maximum_size ({}) must not exceed maximum_size_limit ({})",
                self.maximum_size, self.maximum_size_limit
            )));
        }
        if self.further_values_batch_size < 2 {
            return Err(ConfigError::new("further_values_batch_size must be >= 2"));
        }
        if self.read_back_step.is_zero() {
            return Err(ConfigError::new("read_back_step must be > 0"));
        }
        if self.successive_miss_threshold == 0 {
            return Err(ConfigError::new("successive_miss_threshold must be > 0"));
        }
        if self.max_cached_window == 0 {
            return Err(ConfigError::new("max_cached_window must be > 0"));
        }
        Ok(())
    }
}
