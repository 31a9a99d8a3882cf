//! Windowed range queries for non-monotonic access.
//!
//! Requests that land inside the window are answered by bisection, with
//! older entries prepended when the window does not reach back far enough.
//! Anything else runs the default query and folds its result into the
//! window: an overlapping result is merged with
//! [`merge_unique`](crate::query::merge::merge_unique), a disjoint one
//! replaces the window. Keys may therefore jump back and forth around the
//! window without forcing a reset.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::entry::EntryRef;
use crate::error::{HistoricalResult, InvariantError};
use crate::lookup::HistoricalLookup;
#[cfg(feature = "metrics")]
use crate::metrics::HistoricalMetricsSnapshot;
use crate::query::cached::{check_result_tail, extend_front};
use crate::query::merge::merge_unique;
use crate::query::window::CachedWindow;
use crate::query::{QueryCore, default, with_one_retry};
use crate::source::HistoricalSource;
use crate::time::Timestamp;

type QueryResult<T, S> = HistoricalResult<T, <S as HistoricalSource>::Error>;

#[derive(Debug)]
pub struct TrailingQueryCore<V> {
    window: Mutex<CachedWindow<V>>,
    uncached_fallbacks: AtomicU64,
}

impl<V> TrailingQueryCore<V> {
    pub fn new(max_cached_window: usize) -> Self {
        Self {
            window: Mutex::new(CachedWindow::new(max_cached_window)),
            uncached_fallbacks: AtomicU64::new(0),
        }
    }

    pub fn uncached_fallbacks(&self) -> u64 {
        self.uncached_fallbacks.load(Ordering::Relaxed)
    }

    pub fn window_len(&self) -> usize {
        self.window.lock().len()
    }
}

impl<S: HistoricalSource> QueryCore<S> for TrailingQueryCore<S::Value> {
    fn name(&self) -> &'static str {
        "trailing"
    }

    fn get_previous_entries(
        &self,
        lookup: &HistoricalLookup<S>,
        key: Timestamp,
        n: usize,
    ) -> QueryResult<Vec<EntryRef<S::Value>>, S> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let Some(mut window) = self.window.try_lock() else {
            self.uncached_fallbacks.fetch_add(1, Ordering::Relaxed);
            return default::previous_entries(lookup, key, n);
        };
        with_one_retry(&mut *window, |w| query_trailing(w, lookup, key, n))
    }

    fn clear(&self) {
        self.window.lock().clear();
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.window.lock().check_invariants()
    }

    #[cfg(feature = "metrics")]
    fn write_metrics(&self, snapshot: &mut HistoricalMetricsSnapshot) {
        self.window.lock().metrics.write_into(snapshot);
        snapshot.uncached_fallbacks = self.uncached_fallbacks();
    }
}

fn query_trailing<S: HistoricalSource>(
    window: &mut CachedWindow<S::Value>,
    lookup: &HistoricalLookup<S>,
    key: Timestamp,
    n: usize,
) -> QueryResult<Vec<EntryRef<S::Value>>, S> {
    if let Some(reused) = window.last_query().and_then(|last| last.reuse(key, n)) {
        #[cfg(feature = "metrics")]
        {
            window.metrics.window_hits += 1;
        }
        return Ok(reused);
    }

    let Some(target) = lookup.get_entry(key)? else {
        return Ok(Vec::new());
    };
    if target.key() > key {
        return Ok(Vec::new());
    }

    if window.covers(target.key()) {
        let end = window
            .bisect(target.key())
            .filter(|&i| window.get(i).is_some_and(|e| e.key() == target.key()))
            .ok_or_else(|| InvariantError::new(format!("entry {} missing from cached window", target.key())))?;
        let (start, end, reached_first) = extend_front(window, lookup, end, n)?;
        let result = window.slice(start, end);
        check_result_tail(&result, target.key())?;
        window.trim_front(start);
        window.remember(key, &result, reached_first);
        #[cfg(feature = "metrics")]
        {
            window.metrics.window_hits += 1;
        }
        return Ok(result);
    }

    let result = default::previous_entries(lookup, key, n)?;
    let (Some(oldest), Some(newest)) = (result.first(), result.last()) else {
        return Ok(result);
    };
    let overlaps = match (window.first(), window.last()) {
        (Some(first), Some(last)) => oldest.key() <= last.key() && newest.key() >= first.key(),
        _ => false,
    };
    let merged = if overlaps {
        merge_unique(window.iter().cloned(), result.iter().cloned())
    } else {
        result.clone()
    };
    let oldest_key = oldest.key();
    window.replace(merged);
    if let Some(start) = window.bisect(oldest_key) {
        window.trim_front(start);
    }
    window.remember(key, &result, result.len() < n);
    Ok(result)
}
