//! Windowed range queries for monotonic access.
//!
//! The window is a contiguous run of source entries. Each
//! `get_previous_entries(key, n)` first resolves the entry effective at
//! `key` (usually an index hit) and then classifies it against the window:
//!
//! ```text
//!                 first                      last
//!   window:         [ e0   e1   e2   ...   ek ]
//!
//!   target < first            out-of-range    fresh query, replace
//!   first <= target < last    decremented     bisect, prepend the rest
//!   target == last            same-key        prepend the rest
//!   target > last             incremented     walk back to `last`, append
//! ```
//!
//! An exact repeat of the previous query is answered from the remembered
//! result without touching the window.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::entry::EntryRef;
use crate::error::{HistoricalResult, InvariantError};
use crate::lookup::HistoricalLookup;
#[cfg(feature = "metrics")]
use crate::metrics::HistoricalMetricsSnapshot;
use crate::query::window::CachedWindow;
use crate::query::{QueryCore, default, with_one_retry};
use crate::source::HistoricalSource;
use crate::time::Timestamp;

type QueryResult<T, S> = HistoricalResult<T, <S as HistoricalSource>::Error>;

#[derive(Debug)]
pub struct CachedQueryCore<V> {
    window: Mutex<CachedWindow<V>>,
    max_cached_window: usize,
    uncached_fallbacks: AtomicU64,
}

impl<V> CachedQueryCore<V> {
    pub fn new(max_cached_window: usize) -> Self {
        Self {
            window: Mutex::new(CachedWindow::new(max_cached_window)),
            max_cached_window: max_cached_window.max(1),
            uncached_fallbacks: AtomicU64::new(0),
        }
    }

    /// Queries answered by the default path because the window was busy.
    pub fn uncached_fallbacks(&self) -> u64 {
        self.uncached_fallbacks.load(Ordering::Relaxed)
    }

    pub fn window_len(&self) -> usize {
        self.window.lock().len()
    }
}

impl<S: HistoricalSource> QueryCore<S> for CachedQueryCore<S::Value> {
    fn name(&self) -> &'static str {
        "cached"
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
        with_one_retry(&mut *window, |w| query_window(w, lookup, key, n, self.max_cached_window))
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

fn query_window<S: HistoricalSource>(
    window: &mut CachedWindow<S::Value>,
    lookup: &HistoricalLookup<S>,
    key: Timestamp,
    n: usize,
    max_cached_window: usize,
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

    let (first_key, last_key) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => (first.key(), last.key()),
        _ => return fresh(window, lookup, key, n),
    };

    let end = if target.key() < first_key {
        return fresh(window, lookup, key, n);
    } else if target.key() <= last_key {
        let index = window
            .bisect(target.key())
            .ok_or_else(|| InvariantError::new("bisect found nothing inside the window range"))?;
        match window.get(index) {
            Some(found) if found.key() == target.key() => index,
            _ => {
                return Err(InvariantError::new(format!(
                    "entry {} missing from cached window",
                    target.key()
                ))
                .into());
            },
        }
    } else {
        match walk_back_to(lookup, &target, last_key, n.max(max_cached_window))? {
            Some(newer) => {
                window.append(newer)?;
                window.len() - 1
            },
            // Too far ahead to bridge; nothing in the window is reusable.
            None => return fresh(window, lookup, key, n),
        }
    };

    let (start, end, reached_first) = extend_front(window, lookup, end, n)?;
    let result = window.slice(start, end);
    check_result_tail(&result, target.key())?;
    window.trim_front(start);
    window.remember(key, &result, reached_first);
    #[cfg(feature = "metrics")]
    {
        window.metrics.window_hits += 1;
    }
    Ok(result)
}

/// Entries newer than `stop_key` up to and including `target`, ascending.
/// `None` if more than `limit` of them would be needed.
fn walk_back_to<S: HistoricalSource>(
    lookup: &HistoricalLookup<S>,
    target: &EntryRef<S::Value>,
    stop_key: Timestamp,
    limit: usize,
) -> QueryResult<Option<Vec<EntryRef<S::Value>>>, S> {
    let mut newer = vec![target.clone()];
    let mut cursor = target.clone();
    loop {
        let Some(previous) = lookup.previous_entry(&cursor)? else {
            return Err(InvariantError::new(format!(
                "reached the first entry before window end {stop_key}"
            ))
            .into());
        };
        if previous.key() == stop_key {
            newer.reverse();
            return Ok(Some(newer));
        }
        if previous.key() < stop_key {
            return Err(InvariantError::new(format!(
                "walking back from {} skipped window end {stop_key}",
                target.key()
            ))
            .into());
        }
        if newer.len() >= limit {
            return Ok(None);
        }
        newer.push(previous.clone());
        cursor = previous;
    }
}

/// Makes sure `n` entries end at `end`, prepending older entries as
/// needed. Returns the result range and whether the source ran out.
pub(crate) fn extend_front<S: HistoricalSource>(
    window: &mut CachedWindow<S::Value>,
    lookup: &HistoricalLookup<S>,
    end: usize,
    n: usize,
) -> QueryResult<(usize, usize, bool), S> {
    let have = end + 1;
    let mut end = end;
    let mut reached_first = false;
    if have < n {
        let needed = n - have;
        let Some(first) = window.first().cloned() else {
            return Err(InvariantError::new("cached window emptied while extending").into());
        };
        let older = default::entries_before(lookup, &first, needed)?;
        reached_first = older.len() < needed;
        end += older.len();
        window.prepend(older)?;
    }
    let start = (end + 1).saturating_sub(n);
    Ok((start, end, reached_first))
}

pub(crate) fn check_result_tail<V>(result: &[EntryRef<V>], expected: Timestamp) -> Result<(), InvariantError> {
    match result.last() {
        Some(last) if last.key() == expected => Ok(()),
        Some(last) => Err(InvariantError::new(format!(
            "cached result ends at {} instead of {expected}",
            last.key()
        ))),
        None => Err(InvariantError::new("cached result is empty")),
    }
}

fn fresh<S: HistoricalSource>(
    window: &mut CachedWindow<S::Value>,
    lookup: &HistoricalLookup<S>,
    key: Timestamp,
    n: usize,
) -> QueryResult<Vec<EntryRef<S::Value>>, S> {
    let result = default::previous_entries(lookup, key, n)?;
    let reached_first = result.len() < n;
    window.replace(result.clone());
    window.remember(key, &result, reached_first);
    Ok(result)
}
