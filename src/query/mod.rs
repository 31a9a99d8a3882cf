//! Range query strategies.
//!
//! Every [`QueryCore`] answers the same three questions over a
//! [`HistoricalLookup`]; they differ only in how much of the previous
//! answer they keep around:
//!
//! | Core                  | Keeps                        | Suited to                          |
//! |-----------------------|------------------------------|------------------------------------|
//! | [`DefaultQueryCore`]  | nothing                      | random access, tests               |
//! | [`CachedQueryCore`]   | one window + last result     | monotonic forward/backward scans   |
//! | [`TrailingQueryCore`] | one window, merged on growth | recursive or jittery access        |
//!
//! The windowed cores only ever `try_lock` their window. A query that finds
//! it busy, including a recursive query issued while computing a value for
//! the same cache, is answered by the default path instead.

pub mod cached;
pub mod default;
pub mod merge;
pub mod trailing;
pub mod window;

use std::fmt;

pub use cached::CachedQueryCore;
pub use default::DefaultQueryCore;
pub use trailing::TrailingQueryCore;
pub use window::CachedWindow;

use crate::config::{HistoricalCacheConfig, QueryCoreStrategy};
use crate::entry::EntryRef;
use crate::error::{HistoricalError, HistoricalResult, InvariantError};
use crate::lookup::HistoricalLookup;
#[cfg(feature = "metrics")]
use crate::metrics::HistoricalMetricsSnapshot;
use crate::source::HistoricalSource;
use crate::time::Timestamp;

pub(crate) type Entry<S> = EntryRef<<S as HistoricalSource>::Value>;
type QueryResult<T, S> = HistoricalResult<T, <S as HistoricalSource>::Error>;

/// Strategy for point and range queries over one cache.
pub trait QueryCore<S: HistoricalSource>: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    fn get_entry(&self, lookup: &HistoricalLookup<S>, key: Timestamp) -> QueryResult<Option<Entry<S>>, S> {
        lookup.get_entry(key)
    }

    /// Up to `n` entries with keys `<= key`, ascending, ending at the entry
    /// effective at `key`.
    fn get_previous_entries(
        &self,
        lookup: &HistoricalLookup<S>,
        key: Timestamp,
        n: usize,
    ) -> QueryResult<Vec<Entry<S>>, S>;

    /// Up to `n` entries with keys `>= key`, ascending.
    fn get_next_entries(
        &self,
        lookup: &HistoricalLookup<S>,
        key: Timestamp,
        n: usize,
    ) -> QueryResult<Vec<Entry<S>>, S> {
        default::next_entries(lookup, key, n)
    }

    /// Drops any cached window.
    fn clear(&self) {}

    fn check_invariants(&self) -> Result<(), InvariantError> {
        Ok(())
    }

    #[cfg(feature = "metrics")]
    fn write_metrics(&self, _snapshot: &mut HistoricalMetricsSnapshot) {}
}

impl<S: HistoricalSource> fmt::Debug for dyn QueryCore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCore").field("name", &self.name()).finish()
    }
}

/// Instantiates the core selected by `config.query_core`.
pub fn query_core_for<S: HistoricalSource + 'static>(config: &HistoricalCacheConfig) -> Box<dyn QueryCore<S>> {
    match config.query_core {
        QueryCoreStrategy::Default => Box::new(DefaultQueryCore::new()),
        QueryCoreStrategy::Cached => Box::new(CachedQueryCore::<S::Value>::new(config.max_cached_window)),
        QueryCoreStrategy::Trailing => Box::new(TrailingQueryCore::<S::Value>::new(config.max_cached_window)),
    }
}

/// Runs `attempt`, and once more after resetting the window if it reports
/// an inconsistency. A second inconsistency is returned to the caller.
pub(crate) fn with_one_retry<V, T, E, F>(window: &mut CachedWindow<V>, mut attempt: F) -> HistoricalResult<T, E>
where
    E: std::error::Error + 'static,
    F: FnMut(&mut CachedWindow<V>) -> HistoricalResult<T, E>,
{
    match attempt(window) {
        Err(HistoricalError::Consistency(cause)) => {
            window.reset_for_retry(&cause);
            attempt(window)
        },
        Err(err) => {
            window.clear();
            Err(err)
        },
        ok => ok,
    }
}
