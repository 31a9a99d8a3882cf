//! Fixed-size ring of the most recently consumed further values.
//!
//! The gap-filling engine pops entries off the head of its ascending
//! further-values buffer. The last `N` popped entries are kept here so that
//! a request slightly behind the buffer head can be answered without a new
//! database read. Because entries arrive in ascending key order, the ring is
//! always ascending from oldest to newest.
//!
//! ## Architecture
//!
//! ```text
//!   RecentEntries<V, N=2>
//!
//!   slots: [Option<EntryRef<V>>; N]     cursor: next write position
//!
//!   After pushing 10, 20, 30:
//!
//!   Index:     0      1
//!            ┌──────┬──────┐
//!   slots:   │  30  │  20  │        cursor = 1
//!            └──────┴──────┘
//!
//!   kth_newest(k) = slots[(cursor + N - k) % N]
//!     k=1 (newest): slots[0] = 30
//!     k=2 (oldest): slots[1] = 20
//! ```
//!
//! ## Operations
//!
//! | Operation             | Description                          | Complexity |
//! |-----------------------|--------------------------------------|------------|
//! | `push`                | Add entry (overwrites oldest)        | O(1)       |
//! | `newest` / `oldest`   | Ends of the ring                     | O(1)       |
//! | `latest_at_or_before` | Newest entry with `key <= target`    | O(N)       |
//! | `iter`                | Oldest to newest                     | O(N)       |

use crate::entry::EntryRef;
use crate::time::Timestamp;

/// Ring buffer of the last `N` entries, ascending from oldest to newest.
#[derive(Debug)]
pub struct RecentEntries<V, const N: usize> {
    slots: [Option<EntryRef<V>>; N],
    len: usize,
    cursor: usize,
}

/// Result of [`RecentEntries::latest_at_or_before`].
#[derive(Debug)]
pub struct RecentMatch<V> {
    /// Newest entry whose key is `<= target`.
    pub entry: EntryRef<V>,
    /// The entry pushed right after it, if it is still in the ring.
    pub successor: Option<EntryRef<V>>,
}

impl<V, const N: usize> RecentEntries<V, N> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            len: 0,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pushes an entry, overwriting the oldest if the ring is full.
    pub fn push(&mut self, entry: EntryRef<V>) {
        if N == 0 {
            return;
        }
        debug_assert!(self.newest().is_none_or(|n| n.key() < entry.key()));
        self.slots[self.cursor] = Some(entry);
        self.cursor = (self.cursor + 1) % N;
        if self.len < N {
            self.len += 1;
        }
    }

    /// The k-th newest entry (`k = 1` is the newest).
    pub fn kth_newest(&self, k: usize) -> Option<&EntryRef<V>> {
        if k == 0 || k > self.len {
            return None;
        }
        self.slots[(self.cursor + N - k) % N].as_ref()
    }

    pub fn newest(&self) -> Option<&EntryRef<V>> {
        self.kth_newest(1)
    }

    pub fn oldest(&self) -> Option<&EntryRef<V>> {
        self.kth_newest(self.len)
    }

    /// Iterates from oldest to newest (ascending keys).
    pub fn iter(&self) -> impl Iterator<Item = &EntryRef<V>> + '_ {
        (1..=self.len).rev().filter_map(move |k| self.kth_newest(k))
    }

    /// Newest entry with `key <= target`, plus whichever entry followed it.
    pub fn latest_at_or_before(&self, target: Timestamp) -> Option<RecentMatch<V>> {
        for k in 1..=self.len {
            let entry = self.kth_newest(k)?;
            if entry.key() <= target {
                let successor = if k > 1 { self.kth_newest(k - 1).cloned() } else { None };
                return Some(RecentMatch {
                    entry: entry.clone(),
                    successor,
                });
            }
        }
        None
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
        self.cursor = 0;
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.len <= N);
        let keys: Vec<Timestamp> = self.iter().map(|e| e.key()).collect();
        assert_eq!(keys.len(), self.len);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}

impl<V, const N: usize> Default for RecentEntries<V, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entry::HistoricalEntry;

    fn entry(millis: i64) -> EntryRef<i64> {
        Arc::new(HistoricalEntry::new(Timestamp::from_millis(millis), millis))
    }

    fn keys<const N: usize>(ring: &RecentEntries<i64, N>) -> Vec<i64> {
        ring.iter().map(|e| *e.value()).collect()
    }

    // ==============================================
    // Basic Operations
    // ==============================================

    mod basic_operations {
        use super::*;

        #[test]
        fn new_ring_is_empty() {
            let ring = RecentEntries::<i64, 2>::new();
            assert!(ring.is_empty());
            assert_eq!(ring.capacity(), 2);
            assert!(ring.newest().is_none());
            assert!(ring.oldest().is_none());
        }

        #[test]
        fn push_overwrites_oldest() {
            let mut ring = RecentEntries::<i64, 2>::new();
            ring.push(entry(10));
            ring.push(entry(20));
            assert_eq!(keys(&ring), vec![10, 20]);

            ring.push(entry(30));
            assert_eq!(ring.len(), 2);
            assert_eq!(keys(&ring), vec![20, 30]);
            assert_eq!(*ring.newest().unwrap().value(), 30);
            assert_eq!(*ring.oldest().unwrap().value(), 20);
            ring.debug_validate_invariants();
        }

        #[test]
        fn clear_resets() {
            let mut ring = RecentEntries::<i64, 2>::new();
            ring.push(entry(10));
            ring.clear();
            assert!(ring.is_empty());
            ring.push(entry(5));
            assert_eq!(keys(&ring), vec![5]);
        }

        #[test]
        fn zero_capacity_stays_empty() {
            let mut ring = RecentEntries::<i64, 0>::new();
            ring.push(entry(1));
            assert!(ring.is_empty());
            assert!(ring.latest_at_or_before(Timestamp::MAX).is_none());
        }
    }

    // ==============================================
    // Lookup
    // ==============================================

    mod lookup {
        use super::*;

        #[test]
        fn latest_at_or_before_reports_successor() {
            let mut ring = RecentEntries::<i64, 2>::new();
            ring.push(entry(10));
            ring.push(entry(20));

            let hit = ring.latest_at_or_before(Timestamp::from_millis(15)).unwrap();
            assert_eq!(*hit.entry.value(), 10);
            assert_eq!(*hit.successor.unwrap().value(), 20);

            let hit = ring.latest_at_or_before(Timestamp::from_millis(25)).unwrap();
            assert_eq!(*hit.entry.value(), 20);
            assert!(hit.successor.is_none());
        }

        #[test]
        fn latest_at_or_before_misses_older_keys() {
            let mut ring = RecentEntries::<i64, 2>::new();
            ring.push(entry(10));
            assert!(ring.latest_at_or_before(Timestamp::from_millis(9)).is_none());
        }
    }
}
