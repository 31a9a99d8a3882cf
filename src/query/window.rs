//! The cached window shared by the windowed query cores.
//!
//! A [`CachedWindow`] holds a contiguous, strictly ascending run of source
//! entries together with the result of the last query answered from it.
//! Range queries that move monotonically through time mostly hit the
//! window and only fetch what lies beyond one of its ends.
//!
//! ## Position hints
//!
//! [`CachedWindow::bisect`] remembers where it found each target key in a
//! side table. Hints are stored relative to `mod_increment_index` so that
//! prepending or trimming at the front does not invalidate them:
//!
//! ```text
//!   physical index = stored index + mod_increment_index
//!
//!   prepend k entries      mod_increment_index += k
//!   trim k from front      mod_increment_index -= k
//!   replace wholesale      mod_count += 1, mod_increment_index = 0
//! ```
//!
//! A hint whose `mod_count` differs from the window's is ignored, and every
//! hint is checked against the entries before use, so a stale hint costs a
//! binary search, never a wrong answer.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::entry::EntryRef;
use crate::error::InvariantError;
#[cfg(feature = "metrics")]
use crate::metrics::WindowMetrics;
use crate::time::Timestamp;

/// Resets between two degenerate-access warnings.
pub const RESET_WARNING_INTERVAL: u64 = 100;

const MAX_HINTS: usize = 4_096;

#[derive(Debug, Clone, Copy)]
struct IndexHint {
    mod_count: u64,
    index: i64,
}

/// Result of the last query answered from the window.
#[derive(Debug)]
pub(crate) struct LastQuery<V> {
    pub key: Timestamp,
    pub result: Vec<EntryRef<V>>,
    /// The result reaches back to the first entry in the source.
    pub reached_first: bool,
}

impl<V> LastQuery<V> {
    /// The last `n` entries of the previous result, if they fully answer a
    /// repeat of the same query.
    pub fn reuse(&self, key: Timestamp, n: usize) -> Option<Vec<EntryRef<V>>> {
        if self.key != key || (self.result.len() < n && !self.reached_first) {
            return None;
        }
        let start = self.result.len().saturating_sub(n);
        Some(self.result[start..].to_vec())
    }
}

#[derive(Debug)]
pub struct CachedWindow<V> {
    entries: VecDeque<EntryRef<V>>,
    mod_count: u64,
    mod_increment_index: i64,
    hints: FxHashMap<Timestamp, IndexHint>,
    last_query: Option<LastQuery<V>>,
    max_cached_window: usize,
    resets: u64,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: WindowMetrics,
}

impl<V> CachedWindow<V> {
    pub fn new(max_cached_window: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            mod_count: 0,
            mod_increment_index: 0,
            hints: FxHashMap::default(),
            last_query: None,
            max_cached_window: max_cached_window.max(1),
            resets: 0,
            #[cfg(feature = "metrics")]
            metrics: WindowMetrics::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&EntryRef<V>> {
        self.entries.front()
    }

    pub fn last(&self) -> Option<&EntryRef<V>> {
        self.entries.back()
    }

    pub fn get(&self, index: usize) -> Option<&EntryRef<V>> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryRef<V>> + '_ {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.entries.iter().map(|e| e.key())
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }

    pub(crate) fn last_query(&self) -> Option<&LastQuery<V>> {
        self.last_query.as_ref()
    }

    pub(crate) fn remember(&mut self, key: Timestamp, result: &[EntryRef<V>], reached_first: bool) {
        self.last_query = Some(LastQuery {
            key,
            result: result.to_vec(),
            reached_first,
        });
    }

    /// Whether `key` lies within `[first.key, last.key]`.
    pub fn covers(&self, key: Timestamp) -> bool {
        match (self.entries.front(), self.entries.back()) {
            (Some(first), Some(last)) => first.key() <= key && key <= last.key(),
            _ => false,
        }
    }

    /// Rightmost index whose key is `<= key`.
    pub fn bisect(&mut self, key: Timestamp) -> Option<usize> {
        if let Some(hint) = self.hints.get(&key).copied() {
            if hint.mod_count == self.mod_count {
                let index = hint.index + self.mod_increment_index;
                if let Ok(index) = usize::try_from(index) {
                    if self.is_rightmost_at_or_before(index, key) {
                        return Some(index);
                    }
                }
            }
        }

        let found = self.entries.partition_point(|e| e.key() <= key).checked_sub(1)?;
        if self.hints.len() >= MAX_HINTS {
            self.hints.clear();
        }
        self.hints.insert(
            key,
            IndexHint {
                mod_count: self.mod_count,
                index: found as i64 - self.mod_increment_index,
            },
        );
        Some(found)
    }

    fn is_rightmost_at_or_before(&self, index: usize, key: Timestamp) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        entry.key() <= key && self.entries.get(index + 1).is_none_or(|next| next.key() > key)
    }

    /// Replaces the contents wholesale; invalidates every hint.
    pub fn replace(&mut self, entries: Vec<EntryRef<V>>) {
        self.entries = entries.into();
        self.mod_count += 1;
        self.mod_increment_index = 0;
        self.hints.clear();
        #[cfg(feature = "metrics")]
        {
            self.metrics.window_replacements += 1;
        }
    }

    /// Prepends ascending `entries`, all older than the current first.
    pub fn prepend(&mut self, entries: Vec<EntryRef<V>>) -> Result<(), InvariantError> {
        if let (Some(newest), Some(first)) = (entries.last(), self.entries.front()) {
            if newest.key() >= first.key() {
                return Err(InvariantError::new(format!(
                    "prepended entry {} does not precede window start {}",
                    newest.key(),
                    first.key()
                )));
            }
        }
        let count = entries.len();
        for entry in entries.into_iter().rev() {
            self.entries.push_front(entry);
        }
        self.mod_increment_index += count as i64;
        Ok(())
    }

    /// Appends ascending `entries`, all newer than the current last.
    pub fn append(&mut self, entries: Vec<EntryRef<V>>) -> Result<(), InvariantError> {
        if let (Some(oldest), Some(last)) = (entries.first(), self.entries.back()) {
            if oldest.key() <= last.key() {
                return Err(InvariantError::new(format!(
                    "appended entry {} does not follow window end {}",
                    oldest.key(),
                    last.key()
                )));
            }
        }
        self.entries.extend(entries);
        Ok(())
    }

    /// Copies `start..=end`.
    pub fn slice(&self, start: usize, end: usize) -> Vec<EntryRef<V>> {
        self.entries.range(start..=end).cloned().collect()
    }

    /// Drops entries from the front while the window is larger than its
    /// target size, never dropping index `keep_from` or anything after it.
    /// Returns how many entries were dropped.
    pub fn trim_front(&mut self, keep_from: usize) -> usize {
        let excess = self.entries.len().saturating_sub(self.max_cached_window);
        let drop = excess.min(keep_from);
        if drop > 0 {
            self.entries.drain(..drop);
            self.mod_increment_index -= drop as i64;
        }
        drop
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hints.clear();
        self.last_query = None;
        self.mod_count += 1;
        self.mod_increment_index = 0;
    }

    /// Discards everything after an inconsistency, counting the reset.
    pub fn reset_for_retry(&mut self, cause: &InvariantError) {
        self.clear();
        self.resets += 1;
        #[cfg(feature = "metrics")]
        {
            self.metrics.window_resets += 1;
        }
        tracing::debug!(cause = %cause, resets = self.resets, "resetting cached window");
        if self.resets % RESET_WARNING_INTERVAL == 0 {
            warn!(
                resets = self.resets,
                "cached window reset repeatedly; query keys are jumping, consider the trailing or default query core"
            );
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut previous: Option<Timestamp> = None;
        for key in self.keys() {
            if previous.is_some_and(|p| p >= key) {
                return Err(InvariantError::new(format!("cached window not strictly ascending at {key}")));
            }
            previous = Some(key);
        }
        if let Some(last) = &self.last_query {
            let ascending = last.result.windows(2).all(|w| w[0].key() < w[1].key());
            if !ascending {
                return Err(InvariantError::new("cached result not strictly ascending"));
            }
        }
        Ok(())
    }
}
