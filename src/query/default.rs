//! Uncached range queries: walk neighbour links one entry at a time.
//!
//! Also the fallback of the windowed cores whenever their window is busy.

use crate::error::HistoricalResult;
use crate::lookup::HistoricalLookup;
use crate::query::{Entry, QueryCore};
use crate::source::HistoricalSource;
use crate::time::Timestamp;

type QueryResult<T, S> = HistoricalResult<T, <S as HistoricalSource>::Error>;

/// Up to `n` entries with keys `<= key`, ascending, ending at the entry
/// effective at `key`.
pub fn previous_entries<S: HistoricalSource>(
    lookup: &HistoricalLookup<S>,
    key: Timestamp,
    n: usize,
) -> QueryResult<Vec<Entry<S>>, S> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let Some(last) = lookup.get_entry(key)? else {
        return Ok(Vec::new());
    };
    if last.key() > key {
        return Ok(Vec::new());
    }
    let mut out = entries_before(lookup, &last, n - 1)?;
    out.push(last);
    Ok(out)
}

/// Up to `count` entries strictly before `entry`, ascending.
pub fn entries_before<S: HistoricalSource>(
    lookup: &HistoricalLookup<S>,
    entry: &Entry<S>,
    count: usize,
) -> QueryResult<Vec<Entry<S>>, S> {
    let mut out = Vec::with_capacity(count);
    let mut cursor = entry.clone();
    while out.len() < count {
        match lookup.previous_entry(&cursor)? {
            Some(previous) => {
                out.push(previous.clone());
                cursor = previous;
            },
            None => break,
        }
    }
    out.reverse();
    Ok(out)
}

/// Up to `n` entries with keys `>= key`, ascending.
pub fn next_entries<S: HistoricalSource>(
    lookup: &HistoricalLookup<S>,
    key: Timestamp,
    n: usize,
) -> QueryResult<Vec<Entry<S>>, S> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let Some(first) = lookup.first_entry_at_or_after(key)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(n);
    out.push(first);
    while out.len() < n {
        let Some(current) = out.last() else { break };
        match lookup.next_entry(current)? {
            Some(next) => out.push(next),
            None => break,
        }
    }
    Ok(out)
}

/// Range queries without any window.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultQueryCore;

impl DefaultQueryCore {
    pub fn new() -> Self {
        Self
    }
}

impl<S: HistoricalSource> QueryCore<S> for DefaultQueryCore {
    fn name(&self) -> &'static str {
        "default"
    }

    fn get_previous_entries(
        &self,
        lookup: &HistoricalLookup<S>,
        key: Timestamp,
        n: usize,
    ) -> QueryResult<Vec<Entry<S>>, S> {
        previous_entries(lookup, key, n)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::HistoricalCacheConfig;
    use crate::test_support::{MemorySource, ts};

    fn lookup(keys: &[i64]) -> HistoricalLookup<MemorySource> {
        HistoricalLookup::new(Arc::new(MemorySource::with_keys(keys)), &HistoricalCacheConfig::default())
    }

    fn millis(entries: &[Entry<MemorySource>]) -> Vec<i64> {
        entries.iter().map(|e| e.key().as_millis()).collect()
    }

    #[test]
    fn previous_entries_are_ascending() {
        let l = lookup(&[10, 20, 30]);
        assert_eq!(millis(&previous_entries(&l, ts(30), 3).unwrap()), vec![10, 20, 30]);
        assert_eq!(millis(&previous_entries(&l, ts(25), 2).unwrap()), vec![10, 20]);
    }

    #[test]
    fn previous_entries_short_history_is_not_an_error() {
        let l = lookup(&[10, 20, 30]);
        assert_eq!(millis(&previous_entries(&l, ts(30), 10).unwrap()), vec![10, 20, 30]);
        assert!(previous_entries(&l, ts(5), 3).unwrap().is_empty());
        assert!(previous_entries(&l, ts(30), 0).unwrap().is_empty());
    }

    #[test]
    fn next_entries_start_at_or_after_key() {
        let l = lookup(&[10, 20, 30, 40]);
        assert_eq!(millis(&next_entries(&l, ts(15), 2).unwrap()), vec![20, 30]);
        assert_eq!(millis(&next_entries(&l, ts(30), 5).unwrap()), vec![30, 40]);
        assert!(next_entries(&l, ts(41), 5).unwrap().is_empty());
    }

    #[test]
    fn core_delegates() {
        let l = lookup(&[10, 20, 30]);
        let core = DefaultQueryCore::new();
        let out = QueryCore::<MemorySource>::get_previous_entries(&core, &l, ts(30), 2).unwrap();
        assert_eq!(millis(&out), vec![20, 30]);
        let out = QueryCore::<MemorySource>::get_next_entries(&core, &l, ts(10), 2).unwrap();
        assert_eq!(millis(&out), vec![10, 20]);
    }
}
