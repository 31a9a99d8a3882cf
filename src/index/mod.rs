//! Bounded, thread-safe key index shared by the gap-filling engine and the
//! query cores.
//!
//! [`BoundedIndexCache`] wraps an [`LruIndex`] in a `parking_lot::Mutex`.
//! Lookups take the lock only for the map operation itself: the loader
//! passed to [`compute_if_absent`](BoundedIndexCache::compute_if_absent)
//! runs unlocked, because the gap-filling engine writes into this same
//! index while it loads.
//!
//! ```text
//!   get(key) ──► lock ─► LruIndex::get ─► unlock ──► hit? ──► Some(entry)
//!                                                      │
//!                                                      ▼ miss
//!                                            loader(key)   (unlocked)
//!                                                      │
//!                                                      ▼
//!                                         lock ─► insert(key, entry)
//! ```

pub mod lru;

use parking_lot::Mutex;

pub use lru::LruIndex;

use crate::entry::EntryRef;
use crate::error::InvariantError;
use crate::time::Timestamp;

/// Capacity-limited key → entry mapping with LRU eviction.
#[derive(Debug)]
pub struct BoundedIndexCache<V> {
    inner: Mutex<LruIndex<V>>,
}

impl<V> BoundedIndexCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruIndex::new(capacity)),
        }
    }

    /// Looks up `key`, refreshing its recency.
    pub fn get(&self, key: Timestamp) -> Option<EntryRef<V>> {
        self.inner.lock().get(&key).cloned()
    }

    /// Looks up `key` without refreshing its recency.
    pub fn peek(&self, key: Timestamp) -> Option<EntryRef<V>> {
        self.inner.lock().peek(&key).cloned()
    }

    pub fn contains(&self, key: Timestamp) -> bool {
        self.inner.lock().contains(&key)
    }

    pub fn put(&self, key: Timestamp, entry: EntryRef<V>) {
        self.inner.lock().insert(key, entry);
    }

    /// Stores `entry` under its own key.
    pub fn put_entry(&self, entry: &EntryRef<V>) {
        self.put(entry.key(), entry.clone());
    }

    pub fn remove(&self, key: Timestamp) -> Option<EntryRef<V>> {
        self.inner.lock().remove(&key)
    }

    /// Returns the cached entry for `key`, or runs `loader` and caches a
    /// `Some` result under `key`. `None` results are not cached.
    pub fn compute_if_absent<E, F>(&self, key: Timestamp, loader: F) -> Result<Option<EntryRef<V>>, E>
    where
        F: FnOnce(Timestamp) -> Result<Option<EntryRef<V>>, E>,
    {
        if let Some(entry) = self.get(key) {
            return Ok(Some(entry));
        }
        let loaded = loader(key)?;
        if let Some(entry) = &loaded {
            self.put(key, entry.clone());
        }
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Resizes; shrinking evicts least recently used mappings immediately.
    pub fn set_capacity(&self, capacity: usize) -> usize {
        self.inner.lock().set_capacity(capacity)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entry::HistoricalEntry;

    fn ts(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn entry(millis: i64) -> EntryRef<i64> {
        Arc::new(HistoricalEntry::new(ts(millis), millis))
    }

    #[test]
    fn compute_if_absent_loads_once() {
        let cache = BoundedIndexCache::new(4);
        let mut calls = 0;
        let first: Result<_, ()> = cache.compute_if_absent(ts(25), |_| {
            calls += 1;
            Ok(Some(entry(20)))
        });
        assert_eq!(*first.unwrap().unwrap().value(), 20);

        let second: Result<_, ()> = cache.compute_if_absent(ts(25), |_| {
            calls += 1;
            Ok(None)
        });
        assert_eq!(*second.unwrap().unwrap().value(), 20);
        assert_eq!(calls, 1);
    }

    #[test]
    fn compute_if_absent_does_not_cache_none() {
        let cache: BoundedIndexCache<i64> = BoundedIndexCache::new(4);
        let res: Result<_, ()> = cache.compute_if_absent(ts(1), |_| Ok(None));
        assert!(res.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn compute_if_absent_propagates_errors() {
        let cache: BoundedIndexCache<i64> = BoundedIndexCache::new(4);
        let res = cache.compute_if_absent(ts(1), |_| Err("io"));
        assert_eq!(res.unwrap_err(), "io");
    }

    #[test]
    fn loader_may_write_into_the_same_index() {
        let cache = BoundedIndexCache::new(4);
        let res: Result<_, ()> = cache.compute_if_absent(ts(30), |_| {
            cache.put_entry(&entry(20));
            Ok(Some(entry(30)))
        });
        assert!(res.unwrap().is_some());
        assert!(cache.contains(ts(20)));
        assert!(cache.contains(ts(30)));
    }

    #[test]
    fn shrink_evicts() {
        let cache = BoundedIndexCache::new(4);
        for i in 0..4 {
            cache.put_entry(&entry(i));
        }
        assert_eq!(cache.set_capacity(1), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.capacity(), 1);
        cache.check_invariants().unwrap();
    }
}
