//! Builder for [`HistoricalCache`].
//!
//! Collects a [`HistoricalCacheConfig`] through chained setters and wires
//! the index, gap-filling engine and query core together.
//!
//! ## Example
//!
//! ```rust
//! # use std::convert::Infallible;
//! # use histkit::source::{AscendingValues, HistoricalSource};
//! # use histkit::time::Timestamp;
//! # struct Empty;
//! # impl HistoricalSource for Empty {
//! #     type Value = Timestamp;
//! #     type Error = Infallible;
//! #     fn extract_key(&self, value: &Timestamp) -> Timestamp { *value }
//! #     fn read_latest_value_for(&self, _: Timestamp) -> Result<Option<Timestamp>, Infallible> { Ok(None) }
//! #     fn read_all_values_ascending_from(&self, _: Timestamp)
//! #         -> Result<AscendingValues<'_, Timestamp, Infallible>, Infallible> { Ok(Box::new(std::iter::empty())) }
//! # }
//! use histkit::builder::HistoricalCacheBuilder;
//! use histkit::config::QueryCoreStrategy;
//!
//! let cache = HistoricalCacheBuilder::new()
//!     .maximum_size(500)
//!     .query_core(QueryCoreStrategy::Trailing)
//!     .try_build(Empty)
//!     .unwrap();
//! assert_eq!(cache.maximum_size(), 500);
//!
//! let invalid = HistoricalCacheBuilder::new().maximum_size(0).try_build(Empty);
//! assert!(invalid.is_err());
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::cache::HistoricalCache;
use crate::config::{HistoricalCacheConfig, QueryCoreStrategy};
use crate::error::ConfigError;
use crate::source::HistoricalSource;

/// Builder for creating historical cache instances.
#[derive(Debug, Clone, Default)]
pub struct HistoricalCacheBuilder {
    config: HistoricalCacheConfig,
}

impl HistoricalCacheBuilder {
    /// Starts from the documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: HistoricalCacheConfig) -> Self {
        Self { config }
    }

    /// Initial index capacity.
    pub fn maximum_size(mut self, size: usize) -> Self {
        self.config.maximum_size = size;
        self
    }

    /// Ceiling for automatic capacity increases.
    pub fn maximum_size_limit(mut self, limit: usize) -> Self {
        self.config.maximum_size_limit = limit;
        self
    }

    pub fn further_values_batch_size(mut self, batch: usize) -> Self {
        self.config.further_values_batch_size = batch;
        self
    }

    pub fn read_back_step(mut self, step: Duration) -> Self {
        self.config.read_back_step = step;
        self
    }

    pub fn successive_miss_threshold(mut self, threshold: u32) -> Self {
        self.config.successive_miss_threshold = threshold;
        self
    }

    pub fn max_cached_window(mut self, window: usize) -> Self {
        self.config.max_cached_window = window;
        self
    }

    pub fn query_core(mut self, strategy: QueryCoreStrategy) -> Self {
        self.config.query_core = strategy;
        self
    }

    pub fn config(&self) -> &HistoricalCacheConfig {
        &self.config
    }

    /// Builds a cache over `source`, rejecting invalid configuration.
    pub fn try_build<S>(self, source: S) -> Result<HistoricalCache<S>, ConfigError>
    where
        S: HistoricalSource + 'static,
    {
        self.try_build_shared(Arc::new(source))
    }

    /// Like [`try_build`](Self::try_build) for a source that is shared with
    /// other owners.
    pub fn try_build_shared<S>(self, source: Arc<S>) -> Result<HistoricalCache<S>, ConfigError>
    where
        S: HistoricalSource + 'static,
    {
        HistoricalCache::try_new(source, self.config)
    }

    /// Builds a cache over `source`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; use
    /// [`try_build`](Self::try_build) to handle that case.
    pub fn build<S>(self, source: S) -> HistoricalCache<S>
    where
        S: HistoricalSource + 'static,
    {
        match self.try_build(source) {
            Ok(cache) => cache,
            Err(err) => panic!("invalid historical cache configuration: {err}"),
        }
    }
}
