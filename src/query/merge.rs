//! Streaming merge of two ascending entry sequences.
//!
//! [`MergeAscending`] interleaves two key-ordered iterators;
//! [`SkipDuplicateKeys`] drops every entry whose key equals the one emitted
//! just before it. Together they union an existing cached window with a
//! fresh query result in one pass, without an intermediate sort.

use std::iter::{FusedIterator, Peekable};

use crate::entry::EntryRef;
use crate::time::Timestamp;

/// Merges two ascending iterators. On equal keys the left side comes first.
pub struct MergeAscending<V, L, R>
where
    L: Iterator<Item = EntryRef<V>>,
    R: Iterator<Item = EntryRef<V>>,
{
    left: Peekable<L>,
    right: Peekable<R>,
}

impl<V, L, R> MergeAscending<V, L, R>
where
    L: Iterator<Item = EntryRef<V>>,
    R: Iterator<Item = EntryRef<V>>,
{
    pub fn new(left: L, right: R) -> Self {
        Self {
            left: left.peekable(),
            right: right.peekable(),
        }
    }
}

impl<V, L, R> Iterator for MergeAscending<V, L, R>
where
    L: Iterator<Item = EntryRef<V>>,
    R: Iterator<Item = EntryRef<V>>,
{
    type Item = EntryRef<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let take_left = match (self.left.peek(), self.right.peek()) {
            (Some(l), Some(r)) => l.key() <= r.key(),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if take_left { self.left.next() } else { self.right.next() }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (l_lo, l_hi) = self.left.size_hint();
        let (r_lo, r_hi) = self.right.size_hint();
        let hi = l_hi.zip(r_hi).and_then(|(a, b)| a.checked_add(b));
        (l_lo.saturating_add(r_lo), hi)
    }
}

/// Yields entries from an ascending iterator, skipping adjacent duplicates
/// by key.
pub struct SkipDuplicateKeys<V, I>
where
    I: Iterator<Item = EntryRef<V>>,
{
    inner: I,
    last_key: Option<Timestamp>,
}

impl<V, I> SkipDuplicateKeys<V, I>
where
    I: Iterator<Item = EntryRef<V>>,
{
    pub fn new(inner: I) -> Self {
        Self { inner, last_key: None }
    }
}

impl<V, I> Iterator for SkipDuplicateKeys<V, I>
where
    I: Iterator<Item = EntryRef<V>>,
{
    type Item = EntryRef<V>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.inner.by_ref() {
            if self.last_key == Some(entry.key()) {
                continue;
            }
            self.last_key = Some(entry.key());
            return Some(entry);
        }
        None
    }
}

impl<V, I> FusedIterator for SkipDuplicateKeys<V, I> where I: FusedIterator<Item = EntryRef<V>> {}

/// Ascending union of two ascending sequences, one entry per key.
pub fn merge_unique<V, L, R>(left: L, right: R) -> Vec<EntryRef<V>>
where
    L: IntoIterator<Item = EntryRef<V>>,
    R: IntoIterator<Item = EntryRef<V>>,
{
    SkipDuplicateKeys::new(MergeAscending::new(left.into_iter(), right.into_iter())).collect()
}
