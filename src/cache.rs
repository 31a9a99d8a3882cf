//! The public composition root.
//!
//! A [`HistoricalCache`] owns one [`HistoricalLookup`] (index plus
//! gap-filling engine) and one [`QueryCore`] chosen at build time. It is
//! `Send + Sync`; share it behind an `Arc` to query from several threads.
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use std::convert::Infallible;
//!
//! use histkit::builder::HistoricalCacheBuilder;
//! use histkit::source::{AscendingValues, HistoricalSource};
//! use histkit::time::Timestamp;
//!
//! struct Prices(BTreeMap<Timestamp, f64>);
//!
//! impl HistoricalSource for Prices {
//!     type Value = (Timestamp, f64);
//!     type Error = Infallible;
//!
//!     fn extract_key(&self, value: &Self::Value) -> Timestamp {
//!         value.0
//!     }
//!
//!     fn read_latest_value_for(&self, key: Timestamp) -> Result<Option<Self::Value>, Infallible> {
//!         Ok(self.0.range(..=key).next_back().map(|(k, v)| (*k, *v)))
//!     }
//!
//!     fn read_all_values_ascending_from(
//!         &self,
//!         key: Timestamp,
//!     ) -> Result<AscendingValues<'_, Self::Value, Infallible>, Infallible> {
//!         Ok(Box::new(self.0.range(key..).map(|(k, v)| Ok((*k, *v)))))
//!     }
//! }
//!
//! let prices = Prices(
//!     [(10, 1.0), (20, 2.0), (30, 3.0)]
//!         .into_iter()
//!         .map(|(k, v)| (Timestamp::from_millis(k), v))
//!         .collect(),
//! );
//! let cache = HistoricalCacheBuilder::new().build(prices);
//!
//! let at_25 = cache.get(Timestamp::from_millis(25)).unwrap();
//! assert_eq!(at_25.map(|(_, price)| price), Some(2.0));
//!
//! let trailing = cache.get_previous_entries(Timestamp::from_millis(30), 3).unwrap();
//! assert_eq!(trailing.len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::config::HistoricalCacheConfig;
use crate::entry::EntryRef;
use crate::error::{ConfigError, HistoricalResult, InvariantError};
use crate::lookup::HistoricalLookup;
#[cfg(feature = "metrics")]
use crate::metrics::HistoricalMetricsSnapshot;
use crate::query::{QueryCore, query_core_for};
use crate::source::HistoricalSource;
use crate::time::Timestamp;

type CacheResult<T, S> = HistoricalResult<T, <S as HistoricalSource>::Error>;

/// Gap-filling cache over a time-indexed [`HistoricalSource`].
pub struct HistoricalCache<S: HistoricalSource + 'static> {
    source: Arc<S>,
    lookup: HistoricalLookup<S>,
    query_core: Box<dyn QueryCore<S>>,
    config: HistoricalCacheConfig,
}

impl<S: HistoricalSource + 'static> HistoricalCache<S> {
    /// Validates `config` and builds a cache over `source`.
    pub fn try_new(source: Arc<S>, config: HistoricalCacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let lookup = HistoricalLookup::new(source.clone(), &config);
        let query_core = query_core_for::<S>(&config);
        Ok(Self {
            source,
            lookup,
            query_core,
            config,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &HistoricalCacheConfig {
        &self.config
    }

    /// Value effective at `key`: the one with the greatest key `<= key`, or
    /// the earliest value when `key` precedes all data.
    pub fn get(&self, key: Timestamp) -> CacheResult<Option<S::Value>, S> {
        Ok(self.get_entry(key)?.map(|entry| entry.value().clone()))
    }

    /// Like [`get`](Self::get), returning the entry with its stored key.
    pub fn get_entry(&self, key: Timestamp) -> CacheResult<Option<EntryRef<S::Value>>, S> {
        self.query_core.get_entry(&self.lookup, key)
    }

    /// Up to `n` entries with keys `<= key`, ascending, ending at the entry
    /// effective at `key`. Fewer are returned when history is shorter.
    pub fn get_previous_entries(&self, key: Timestamp, n: usize) -> CacheResult<Vec<EntryRef<S::Value>>, S> {
        self.query_core.get_previous_entries(&self.lookup, key, n)
    }

    /// Up to `n` entries with keys `>= key`, ascending.
    pub fn get_next_entries(&self, key: Timestamp, n: usize) -> CacheResult<Vec<EntryRef<S::Value>>, S> {
        self.query_core.get_next_entries(&self.lookup, key, n)
    }

    /// Forgets all cached entries. Bounds and buffers are reset lazily by
    /// the next load.
    pub fn clear(&self) {
        self.lookup.clear();
        self.query_core.clear();
    }

    /// Current index capacity.
    pub fn maximum_size(&self) -> usize {
        self.lookup.index().capacity()
    }

    pub fn len(&self) -> usize {
        self.lookup.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.index().is_empty()
    }

    /// Resizes the index. Shrinking evicts least recently used entries at
    /// once; a size above the configured limit raises the limit.
    pub fn set_maximum_size(&self, size: usize) {
        self.lookup
            .engine()
            .set_maximum_size(size, self.config.maximum_size_limit);
    }

    /// Grows the index to `size`, clamped to the limit. Returns `true` if
    /// the capacity changed.
    pub fn increase_maximum_size(&self, size: usize, reason: &str) -> bool {
        self.lookup.engine().increase_maximum_size(size, reason)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.lookup.index().check_invariants()?;
        self.query_core.check_invariants()
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> HistoricalMetricsSnapshot {
        let mut snapshot = HistoricalMetricsSnapshot::default();
        self.lookup.engine().write_metrics(&mut snapshot);
        self.query_core.write_metrics(&mut snapshot);
        snapshot.index_len = self.lookup.index().len();
        snapshot.index_capacity = self.lookup.index().capacity();
        snapshot
    }
}

impl<S: HistoricalSource + 'static> fmt::Debug for HistoricalCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoricalCache")
            .field("lookup", &self.lookup)
            .field("query_core", &self.query_core.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryCoreStrategy;
    use crate::test_support::{MemorySource, ts};

    fn cache(keys: &[i64], strategy: QueryCoreStrategy) -> HistoricalCache<MemorySource> {
        let config = HistoricalCacheConfig::default().with_query_core(strategy);
        HistoricalCache::try_new(Arc::new(MemorySource::with_keys(keys)), config).unwrap()
    }

    #[test]
    fn get_returns_values() {
        let c = cache(&[10, 20, 30], QueryCoreStrategy::Cached);
        assert_eq!(c.get(ts(25)).unwrap().map(|p| p.value), Some(200));
        assert_eq!(c.get(ts(5)).unwrap().map(|p| p.value), Some(100));
    }

    #[test]
    fn try_new_rejects_invalid_config() {
        let config = HistoricalCacheConfig::default().with_maximum_size(0);
        assert!(HistoricalCache::try_new(Arc::new(MemorySource::default()), config).is_err());
    }

    #[test]
    fn set_maximum_size_shrinks_and_raises_limit() {
        let c = cache(&[10, 20, 30], QueryCoreStrategy::Default);
        c.get(ts(30)).unwrap();
        c.set_maximum_size(1);
        assert_eq!(c.maximum_size(), 1);
        assert_eq!(c.len(), 1);
        c.set_maximum_size(20_000);
        assert!(!c.increase_maximum_size(20_001, "test"));
        assert_eq!(c.maximum_size(), 20_000);
    }

    #[test]
    fn increase_is_clamped_to_limit() {
        let c = cache(&[10], QueryCoreStrategy::Default);
        assert!(c.increase_maximum_size(50_000, "test"));
        assert_eq!(c.maximum_size(), 10_000);
    }

    #[test]
    fn every_strategy_agrees() {
        let keys: Vec<i64> = (1..=40).map(|k| k * 5).collect();
        let caches = [
            cache(&keys, QueryCoreStrategy::Default),
            cache(&keys, QueryCoreStrategy::Cached),
            cache(&keys, QueryCoreStrategy::Trailing),
        ];
        for key in [50, 52, 60, 61, 40, 200, 3] {
            let expected: Vec<_> = caches[0]
                .get_previous_entries(ts(key), 4)
                .unwrap()
                .iter()
                .map(|e| e.key())
                .collect();
            for c in &caches[1..] {
                let got: Vec<_> = c.get_previous_entries(ts(key), 4).unwrap().iter().map(|e| e.key()).collect();
                assert_eq!(got, expected, "key {key}");
                c.check_invariants().unwrap();
            }
        }
    }
}
