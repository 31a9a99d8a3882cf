//! Immutable `(key, value)` entries with once-only neighbour links.
//!
//! A [`HistoricalEntry`] is what the index stores and what range queries
//! return. The key and value never change after construction. The previous
//! and next keys start out unknown and are recorded at most once, either
//! while the gap-filling engine scans past consecutive values or when a
//! range query resolves a neighbour explicitly. Because data is only ever
//! appended at the high end, a neighbour link, once known, stays valid.
//!
//! ```text
//!   ┌──────────────┐  next  ┌──────────────┐  next  ┌──────────────┐
//!   │ key=10  v=a  │ ─────► │ key=20  v=b  │ ─────► │ key=30  v=c  │
//!   │              │ ◄───── │              │ ◄───── │              │
//!   └──────────────┘  prev  └──────────────┘  prev  └──────────────┘
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::time::Timestamp;

/// Shared handle to an entry; entries are handed out by reference count.
pub type EntryRef<V> = Arc<HistoricalEntry<V>>;

/// A stored value together with the key the source reports for it.
pub struct HistoricalEntry<V> {
    key: Timestamp,
    value: V,
    previous_key: OnceLock<Option<Timestamp>>,
    next_key: OnceLock<Option<Timestamp>>,
}

impl<V> HistoricalEntry<V> {
    pub fn new(key: Timestamp, value: V) -> Self {
        Self {
            key,
            value,
            previous_key: OnceLock::new(),
            next_key: OnceLock::new(),
        }
    }

    #[inline]
    pub fn key(&self) -> Timestamp {
        self.key
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Previous key if resolved: `Some(None)` means "known to be the first".
    #[inline]
    pub fn previous_key(&self) -> Option<Option<Timestamp>> {
        self.previous_key.get().copied()
    }

    /// Next key if resolved: `Some(None)` means "nothing after this yet".
    ///
    /// "Nothing after" is never recorded permanently, since new data may be
    /// appended; see [`HistoricalEntry::link_next`].
    #[inline]
    pub fn next_key(&self) -> Option<Option<Timestamp>> {
        self.next_key.get().copied()
    }

    /// Records the previous key. Returns `false` if a link was already set.
    pub fn link_previous(&self, previous: Option<Timestamp>) -> bool {
        debug_assert!(previous.is_none_or(|p| p < self.key));
        self.previous_key.set(previous).is_ok()
    }

    /// Records the next key. Returns `false` if a link was already set.
    pub fn link_next(&self, next: Timestamp) -> bool {
        debug_assert!(next > self.key);
        self.next_key.set(Some(next)).is_ok()
    }
}

/// Links two entries that are known to be consecutive in the source.
pub(crate) fn link_pair<V>(previous: &HistoricalEntry<V>, next: &HistoricalEntry<V>) {
    if previous.key < next.key {
        previous.link_next(next.key);
        next.link_previous(Some(previous.key));
    }
}

impl<V: fmt::Debug> fmt::Debug for HistoricalEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoricalEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("previous_key", &self.previous_key.get())
            .field("next_key", &self.next_key.get())
            .finish()
    }
}

impl<V: PartialEq> PartialEq for HistoricalEntry<V> {
    /// Links are bookkeeping; equality is by key and value.
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn links_start_unresolved() {
        let entry = HistoricalEntry::new(ts(10), "a");
        assert_eq!(entry.key(), ts(10));
        assert_eq!(*entry.value(), "a");
        assert_eq!(entry.previous_key(), None);
        assert_eq!(entry.next_key(), None);
    }

    #[test]
    fn first_link_wins() {
        let entry = HistoricalEntry::new(ts(20), 2);
        assert!(entry.link_previous(Some(ts(10))));
        assert!(!entry.link_previous(Some(ts(15))));
        assert_eq!(entry.previous_key(), Some(Some(ts(10))));

        assert!(entry.link_next(ts(30)));
        assert!(!entry.link_next(ts(25)));
        assert_eq!(entry.next_key(), Some(Some(ts(30))));
    }

    #[test]
    fn link_pair_sets_both_directions() {
        let a = HistoricalEntry::new(ts(10), 1);
        let b = HistoricalEntry::new(ts(20), 2);
        link_pair(&a, &b);
        assert_eq!(a.next_key(), Some(Some(ts(20))));
        assert_eq!(b.previous_key(), Some(Some(ts(10))));
    }

    #[test]
    fn link_pair_ignores_unordered_pairs() {
        let a = HistoricalEntry::new(ts(10), 1);
        let b = HistoricalEntry::new(ts(10), 2);
        link_pair(&a, &b);
        assert_eq!(a.next_key(), None);
        assert_eq!(b.previous_key(), None);
    }

    #[test]
    fn equality_ignores_links() {
        let a = HistoricalEntry::new(ts(10), 1);
        let b = HistoricalEntry::new(ts(10), 1);
        a.link_next(ts(20));
        assert_eq!(a, b);
    }
}
