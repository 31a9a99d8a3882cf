//! The gap-filling load algorithm.
//!
//! [`GapFillEngine::load_value`] answers "which entry is effective at this
//! key" for a single cache instance while touching the backing source as
//! rarely as possible. It keeps an ascending buffer of *further values*
//! read with [`HistoricalSource::read_all_values_ascending_from`] and
//! consumes it from the head as requests move forward in time. Every value
//! it scans past is written into the shared [`BoundedIndexCache`] and
//! linked to its neighbour, which is the gap filling: entries between two
//! requests become cached without being asked for.
//!
//! ## Load order
//!
//! ```text
//!   load_value(key)
//!     │
//!     ├─ 1. apply deferred clear
//!     ├─ 2. track requested min/max key
//!     ├─ 3. refresh DB bounds (only when unknown or outgrown)
//!     ├─ 4. fast path: key at/before DB min, or at/after DB max ──► hit
//!     ├─ 5. (re)load further values if the buffer cannot answer
//!     ├─ 6. search further values, gap-filling the index
//!     ├─ 7. suspected eviction? force one reload and search again
//!     ├─ 8. fast paths again with refreshed bounds              ──► hit
//!     └─ 9. read_latest_value_for(key)  (last resort)
//! ```
//!
//! ## State
//!
//! | Field                              | Meaning                                     |
//! |------------------------------------|---------------------------------------------|
//! | `min_key_in_db` / `max_key_in_db`  | approximate data bounds, ratchet outward    |
//! | `min_key` / `max_key`              | extremes ever requested                     |
//! | `further_values`                   | ascending buffer, consumed from the head    |
//! | `last_values_from_further_values`  | last two consumed entries                   |
//! | `*_from_load_further_values`       | head/tail of the most recent load           |
//! | `last_load_start`                  | guards continuation loads from repeating    |
//!
//! All of it sits behind one `parking_lot::Mutex`; `clear()` only sets an
//! atomic flag that the next load applies under that lock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::HistoricalCacheConfig;
use crate::ds::RecentEntries;
use crate::entry::{EntryRef, HistoricalEntry, link_pair};
use crate::error::{HistoricalError, HistoricalResult, InvariantError};
use crate::gap::miss::{DENSE_LOAD_ELEMENTS, MissCounter};
use crate::index::BoundedIndexCache;
#[cfg(feature = "metrics")]
use crate::metrics::GapMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::HistoricalMetricsSnapshot;
use crate::source::HistoricalSource;
use crate::time::Timestamp;

type Entry<S> = EntryRef<<S as HistoricalSource>::Value>;
type LoadResult<T, S> = HistoricalResult<T, <S as HistoricalSource>::Error>;

/// Best-known bounds of the data in the backing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KnownBounds {
    pub min_key_in_db: Option<Timestamp>,
    pub max_key_in_db: Option<Timestamp>,
}

#[derive(Debug)]
struct GapState<V> {
    min_key_in_db: Option<Timestamp>,
    max_key_in_db: Option<Timestamp>,
    /// Previous DB min, when this call discovered a strictly lower one.
    min_key_in_db_lowered_from: Option<Timestamp>,
    min_key: Option<Timestamp>,
    max_key: Option<Timestamp>,
    further_values: VecDeque<EntryRef<V>>,
    last_values_from_further_values: RecentEntries<V, 2>,
    min_key_in_db_from_load_further_values: Option<Timestamp>,
    max_key_in_db_from_load_further_values: Option<Timestamp>,
    further_values_loaded: bool,
    last_load_start: Option<Timestamp>,
    miss_counter: MissCounter,
    #[cfg(feature = "metrics")]
    metrics: GapMetrics,
}

impl<V> GapState<V> {
    fn new(miss_counter: MissCounter) -> Self {
        Self {
            min_key_in_db: None,
            max_key_in_db: None,
            min_key_in_db_lowered_from: None,
            min_key: None,
            max_key: None,
            further_values: VecDeque::new(),
            last_values_from_further_values: RecentEntries::new(),
            min_key_in_db_from_load_further_values: None,
            max_key_in_db_from_load_further_values: None,
            further_values_loaded: false,
            last_load_start: None,
            miss_counter,
            #[cfg(feature = "metrics")]
            metrics: GapMetrics::default(),
        }
    }

    /// Forgets bounds and buffers. Tuning survives.
    fn reset(&mut self) {
        self.min_key_in_db = None;
        self.max_key_in_db = None;
        self.min_key_in_db_lowered_from = None;
        self.min_key = None;
        self.max_key = None;
        self.clear_buffers();
        self.min_key_in_db_from_load_further_values = None;
        self.max_key_in_db_from_load_further_values = None;
        self.further_values_loaded = false;
        #[cfg(feature = "metrics")]
        {
            self.metrics.clears_applied += 1;
        }
    }

    fn clear_buffers(&mut self) {
        self.further_values.clear();
        self.last_values_from_further_values.clear();
        self.last_load_start = None;
    }

    /// Raises a known DB max that an observed entry has outgrown.
    fn observe_max(&mut self, key: Timestamp) {
        if self.max_key_in_db.is_some_and(|m| key > m) {
            self.max_key_in_db = Some(key);
        }
    }

    /// Key of the newest entry buffered or consumed.
    fn buffered_tail_key(&self) -> Option<Timestamp> {
        self.further_values
            .back()
            .or(self.last_values_from_further_values.newest())
            .map(|e| e.key())
    }
}

/// Per-cache gap-filling loader. Not re-entrant: every load runs under
/// one mutex.
pub struct GapFillEngine<S: HistoricalSource> {
    source: Arc<S>,
    index: Arc<BoundedIndexCache<S::Value>>,
    state: Mutex<GapState<S::Value>>,
    clear_requested: AtomicBool,
    batch_size: usize,
}

impl<S: HistoricalSource> GapFillEngine<S> {
    pub fn new(source: Arc<S>, index: Arc<BoundedIndexCache<S::Value>>, config: &HistoricalCacheConfig) -> Self {
        let miss_counter = MissCounter::new(
            config.read_back_step,
            config.successive_miss_threshold,
            config.maximum_size_limit,
        );
        Self {
            source,
            index,
            state: Mutex::new(GapState::new(miss_counter)),
            clear_requested: AtomicBool::new(false),
            batch_size: config.further_values_batch_size.max(2),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Defers a reset of bounds and buffers to the next load.
    pub fn request_clear(&self) {
        self.clear_requested.store(true, Ordering::Release);
    }

    pub fn known_bounds(&self) -> KnownBounds {
        let state = self.state.lock();
        KnownBounds {
            min_key_in_db: state.min_key_in_db,
            max_key_in_db: state.max_key_in_db,
        }
    }

    pub fn optimal_read_back_step(&self) -> std::time::Duration {
        self.state.lock().miss_counter.optimal_read_back_step()
    }

    /// Grows the index to `target`, never beyond the configured ceiling.
    /// Returns `true` if the capacity changed.
    pub fn increase_maximum_size(&self, target: usize, reason: &str) -> bool {
        let mut state = self.state.lock();
        self.grow_index(&mut state, target, reason)
    }

    /// Sets the index capacity outright; raises the ceiling if needed.
    pub fn set_maximum_size(&self, size: usize, limit: usize) {
        let mut state = self.state.lock();
        state.miss_counter.set_maximum_size_limit(limit.max(size));
        self.index.set_capacity(size.max(1));
    }

    fn grow_index(&self, state: &mut GapState<S::Value>, target: usize, reason: &str) -> bool {
        let target = target.min(state.miss_counter.maximum_size_limit());
        let current = self.index.capacity();
        if target <= current {
            return false;
        }
        self.index.set_capacity(target);
        info!(from = current, to = target, reason, "increasing historical index capacity");
        #[cfg(feature = "metrics")]
        {
            state.metrics.capacity_increases += 1;
        }
        true
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn write_metrics(&self, snapshot: &mut HistoricalMetricsSnapshot) {
        self.state.lock().metrics.write_into(snapshot);
    }

    // ------------------------------------------------------------------
    // Source access
    // ------------------------------------------------------------------

    fn to_entry(&self, value: S::Value) -> Entry<S> {
        Arc::new(HistoricalEntry::new(self.source.extract_key(&value), value))
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn read_latest(&self, state: &mut GapState<S::Value>, key: Timestamp) -> LoadResult<Option<Entry<S>>, S> {
        #[cfg(feature = "metrics")]
        {
            state.metrics.latest_reads += 1;
        }
        let value = self
            .source
            .read_latest_value_for(key)
            .map_err(HistoricalError::Source)?;
        Ok(value.map(|v| self.to_entry(v)))
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn read_ascending(
        &self,
        state: &mut GapState<S::Value>,
        from: Timestamp,
        limit: usize,
    ) -> LoadResult<Vec<Entry<S>>, S> {
        #[cfg(feature = "metrics")]
        {
            state.metrics.ascending_reads += 1;
        }
        let values = self
            .source
            .read_all_values_ascending_from(from)
            .map_err(HistoricalError::Source)?;
        let mut out = Vec::with_capacity(limit.min(64));
        for value in values.take(limit) {
            out.push(self.to_entry(value.map_err(HistoricalError::Source)?));
        }
        Ok(out)
    }

    /// First entry strictly after `key`, straight from the buffer when the
    /// engine just consumed `key`, else from the source.
    pub fn read_next_entry(&self, key: Timestamp) -> LoadResult<Option<Entry<S>>, S> {
        let mut state = self.state.lock();
        if let Some(newest) = state.last_values_from_further_values.newest() {
            if newest.key() == key {
                if let Some(head) = state.further_values.front() {
                    return Ok(Some(head.clone()));
                }
            }
        }
        let next = self
            .read_ascending(&mut state, key.next(), 1)?
            .into_iter()
            .next()
            .filter(|e| e.key() > key);
        if let Some(entry) = &next {
            state.observe_max(entry.key());
        }
        Ok(next)
    }

    /// Latest entry strictly before `key`, read from the source. Never
    /// answered from the index, whose mappings for requested keys may
    /// predate appended values.
    pub fn read_previous_entry(&self, key: Timestamp) -> LoadResult<Option<Entry<S>>, S> {
        if key == Timestamp::MIN {
            return Ok(None);
        }
        let mut state = self.state.lock();
        let previous = self.read_latest(&mut state, key.prev())?;
        Ok(previous.filter(|e| e.key() < key))
    }

    // ------------------------------------------------------------------
    // load_value
    // ------------------------------------------------------------------

    /// Resolves the entry effective at `key`, populating the index.
    pub fn load_value(&self, key: Timestamp) -> LoadResult<Option<Entry<S>>, S> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if self.clear_requested.swap(false, Ordering::AcqRel) {
            debug!("applying deferred historical cache clear");
            state.reset();
        }
        state.further_values_loaded = false;
        state.min_key_in_db_lowered_from = None;
        #[cfg(feature = "metrics")]
        {
            state.metrics.load_calls += 1;
        }

        let previous_max_key = state.max_key;
        let new_max_key = state.max_key.is_none_or(|m| key > m);
        let new_min_key = state.min_key.is_none_or(|m| key < m);
        if new_max_key {
            state.max_key = Some(key);
        }
        if new_min_key {
            state.min_key = Some(key);
        }

        self.eventually_get_min_key_in_db(state, false)?;
        self.eventually_get_max_key_in_db(state, key, new_max_key, false)?;

        if let Some(entry) = self.load_from_cache_before_load_further_values(state, key, new_max_key) {
            state.miss_counter.record_hit();
            #[cfg(feature = "metrics")]
            {
                state.metrics.fast_path_hits += 1;
            }
            return Ok(Some(entry));
        }

        if !state.further_values_loaded && self.should_load_further_values(state, key) {
            self.load_further_values_for(state, key, false)?;
        }
        let mut value = self.search_in_further_values(state, key)?;

        if self.is_potentially_already_evicted(state, key, value.as_ref()) {
            #[cfg(feature = "metrics")]
            {
                state.metrics.eviction_retries += 1;
            }
            let current = self.index.capacity();
            if let Some(target) = state.miss_counter.record_potential_eviction(current) {
                self.grow_index(state, target, "successive suspected evictions");
            }
            debug!(%key, "value potentially evicted, reloading further values");
            self.load_further_values_for(state, key, true)?;
            value = self.search_in_further_values(state, key)?;
        } else {
            state.miss_counter.record_hit();
        }

        if value.is_none() {
            value = self.try_load_from_cache_after_load_further_values(state, key, new_max_key, previous_max_key);
        }
        if value.is_none() {
            value = self.read_newest_value_from_db(state, key)?;
        }
        Ok(value)
    }

    // ------------------------------------------------------------------
    // DB bounds
    // ------------------------------------------------------------------

    fn eventually_get_min_key_in_db(&self, state: &mut GapState<S::Value>, force: bool) -> LoadResult<(), S> {
        if state.min_key_in_db.is_some() && !force {
            return Ok(());
        }
        let first = match self.read_latest(state, Timestamp::MIN)? {
            Some(entry) => Some(entry),
            None => self.read_ascending(state, Timestamp::MIN, 1)?.into_iter().next(),
        };
        if let Some(entry) = first {
            if state.min_key_in_db.is_none_or(|m| entry.key() < m) {
                state.min_key_in_db_lowered_from = state.min_key_in_db;
                state.min_key_in_db = Some(entry.key());
                self.index.put_entry(&entry);
            }
        }
        Ok(())
    }

    fn eventually_get_max_key_in_db(
        &self,
        state: &mut GapState<S::Value>,
        key: Timestamp,
        new_max_key: bool,
        force: bool,
    ) -> LoadResult<(), S> {
        let outgrown = state.max_key_in_db.is_none_or(|m| new_max_key && key > m);
        if !outgrown && !force {
            return Ok(());
        }
        if !self.source.is_already_adjusting_key() {
            if let Some(highest) = self.source.highest_allowed_key() {
                if state.max_key_in_db.is_none_or(|m| highest > m) {
                    state.max_key_in_db = Some(highest);
                }
                return Ok(());
            }
        }
        if let Some(entry) = self.read_latest(state, Timestamp::MAX)? {
            if state.max_key_in_db.is_none_or(|m| entry.key() > m) {
                state.max_key_in_db = Some(entry.key());
                self.index.put_entry(&entry);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fast paths
    // ------------------------------------------------------------------

    fn cached_min_value(&self, state: &GapState<S::Value>, key: Timestamp) -> Option<Entry<S>> {
        let min_db = state.min_key_in_db?;
        if key > min_db {
            return None;
        }
        [state.min_key, Some(min_db)]
            .into_iter()
            .flatten()
            .filter_map(|probe| self.index.get(probe))
            .find(|entry| entry.key() == min_db)
    }

    fn load_from_cache_before_load_further_values(
        &self,
        state: &GapState<S::Value>,
        key: Timestamp,
        new_max_key: bool,
    ) -> Option<Entry<S>> {
        if let Some(entry) = self.cached_min_value(state, key) {
            return Some(entry);
        }
        // A new maximum request scans forward instead, so it gap-fills.
        let max_db = state.max_key_in_db?;
        if !new_max_key && key >= max_db {
            return self.index.get(max_db).filter(|entry| entry.key() == max_db);
        }
        None
    }

    fn try_load_from_cache_after_load_further_values(
        &self,
        state: &GapState<S::Value>,
        key: Timestamp,
        new_max_key: bool,
        previous_max_key: Option<Timestamp>,
    ) -> Option<Entry<S>> {
        if let Some(entry) = self.cached_min_value(state, key) {
            return Some(entry);
        }
        let (previous_max_key, max_db) = (previous_max_key?, state.max_key_in_db?);
        if new_max_key && key > max_db {
            return self.index.peek(previous_max_key).filter(|entry| entry.key() >= max_db);
        }
        None
    }

    fn read_newest_value_from_db(&self, state: &mut GapState<S::Value>, key: Timestamp) -> LoadResult<Option<Entry<S>>, S> {
        #[cfg(feature = "metrics")]
        {
            state.metrics.last_resort_reads += 1;
        }
        let found = match self.read_latest(state, key)? {
            Some(entry) => Some(entry),
            // `key` precedes all data.
            None => self.read_ascending(state, Timestamp::MIN, 1)?.into_iter().next(),
        };
        if let Some(entry) = &found {
            state.observe_max(entry.key());
            self.index.put_entry(entry);
        }
        Ok(found)
    }

    // ------------------------------------------------------------------
    // Further values
    // ------------------------------------------------------------------

    fn should_load_further_values(&self, state: &GapState<S::Value>, key: Timestamp) -> bool {
        if state.further_values.is_empty() {
            let ring = &state.last_values_from_further_values;
            match (ring.oldest(), ring.newest()) {
                (Some(oldest), Some(newest)) => {
                    let reached_end = state.max_key_in_db.is_some_and(|m| newest.key() >= m);
                    if !(reached_end && key >= oldest.key()) {
                        return true;
                    }
                },
                _ => return true,
            }
        }
        if let Some(min_load) = state.min_key_in_db_from_load_further_values {
            let earlier_data_possible = state.min_key_in_db.is_none_or(|m| min_load > m);
            if key < min_load && earlier_data_possible {
                return true;
            }
            if state.min_key_in_db_lowered_from == Some(min_load) {
                return true;
            }
        }
        false
    }

    /// Loads further values so that `key` can be answered: continues from
    /// the consumed tail when it lies inside the read-back window, else
    /// restarts `optimal_read_back_step` before `key`.
    fn load_further_values_for(&self, state: &mut GapState<S::Value>, key: Timestamp, force_restart: bool) -> LoadResult<(), S> {
        let step = state.miss_counter.optimal_read_back_step();
        let mut from = key.saturating_sub(step);
        if let Some(min_db) = state.min_key_in_db {
            from = from.max(min_db);
        }

        let consumed_tail = state
            .last_values_from_further_values
            .newest()
            .map(|e| e.key())
            .filter(|_| state.further_values.is_empty());
        if let Some(tail) = consumed_tail {
            if !force_restart && tail >= from && tail <= key {
                return self.eventually_load_further_values(state, key, tail, true);
            }
        }

        state.clear_buffers();
        self.eventually_load_further_values(state, key, from, false)?;

        let behind = state.further_values.partition_point(|e| e.key() <= key);
        match state.further_values.front() {
            Some(head) if behind == 0 && state.min_key_in_db.is_some_and(|m| head.key() > m) => {
                state.miss_counter.record_read_back_too_short();
            },
            _ if behind > DENSE_LOAD_ELEMENTS => {
                let span = key.duration_since(state.further_values[behind - DENSE_LOAD_ELEMENTS].key());
                state.miss_counter.record_read_back_span(behind, span);
            },
            _ => {},
        }
        Ok(())
    }

    /// Pages through `read_all_values_ascending_from` until the buffer
    /// reaches `key`, the known DB max, or the end of data.
    fn eventually_load_further_values(
        &self,
        state: &mut GapState<S::Value>,
        key: Timestamp,
        from: Timestamp,
        continuation: bool,
    ) -> LoadResult<(), S> {
        #[cfg(feature = "metrics")]
        {
            state.metrics.further_value_loads += 1;
        }
        debug!(%key, %from, continuation, "loading further values");

        let mut resume_after = if continuation { Some(from) } else { state.buffered_tail_key() };
        let mut cursor = from;
        let mut previous_batch_tail: Option<Timestamp> = None;
        loop {
            let batch = self.read_ascending(state, cursor, self.batch_size)?;
            let exhausted = batch.len() < self.batch_size;
            let Some(batch_tail) = batch.last().map(|e| e.key()) else {
                break;
            };
            if previous_batch_tail == Some(batch_tail) {
                break;
            }
            previous_batch_tail = Some(batch_tail);

            let skip_through = resume_after;
            for entry in batch {
                if skip_through.is_some_and(|s| entry.key() <= s) {
                    continue;
                }
                resume_after = Some(entry.key());
                state.further_values.push_back(entry);
            }

            let reached_max = state.max_key_in_db.is_some_and(|m| batch_tail >= m);
            if exhausted || batch_tail >= key || reached_max {
                break;
            }
            cursor = batch_tail;
        }

        self.check_further_values_ascending(state)?;
        state.further_values_loaded = true;
        state.last_load_start = Some(from);

        let head = state.further_values.front().map(|e| e.key());
        let tail = state.further_values.back().map(|e| e.key());
        if let (Some(head), Some(tail)) = (head, tail) {
            if !continuation || state.min_key_in_db_from_load_further_values.is_none() {
                state.min_key_in_db_from_load_further_values = Some(head);
            }
            state.max_key_in_db_from_load_further_values = Some(tail);
            if state.min_key_in_db.is_none_or(|m| head < m) {
                state.min_key_in_db_lowered_from = state.min_key_in_db;
                state.min_key_in_db = Some(head);
            }
            if state.max_key_in_db.is_none_or(|m| tail > m) {
                state.max_key_in_db = Some(tail);
            }
        }
        Ok(())
    }

    fn check_further_values_ascending(&self, state: &GapState<S::Value>) -> Result<(), InvariantError> {
        let mut previous = state.last_values_from_further_values.newest().map(|e| e.key());
        for entry in &state.further_values {
            if let Some(p) = previous {
                if entry.key() <= p {
                    return Err(InvariantError::new(format!(
                        "further values not strictly ascending: {} follows {}",
                        entry.key(),
                        p
                    )));
                }
            }
            previous = Some(entry.key());
        }
        Ok(())
    }

    /// Finds the entry effective at `key` in the consumed ring or the
    /// buffer, popping and indexing every buffered entry up to `key`.
    fn search_in_further_values(&self, state: &mut GapState<S::Value>, key: Timestamp) -> LoadResult<Option<Entry<S>>, S> {
        if let Some(hit) = state.last_values_from_further_values.latest_at_or_before(key) {
            let next_key = match &hit.successor {
                Some(successor) => Some(successor.key()),
                None => state.further_values.front().map(|e| e.key()),
            };
            let at_end = next_key.is_none() && state.max_key_in_db.is_some_and(|m| hit.entry.key() >= m);
            if next_key.is_some_and(|n| n > key) || at_end {
                return Ok(Some(hit.entry));
            }
        }

        let mut last = state
            .last_values_from_further_values
            .newest()
            .filter(|e| e.key() <= key)
            .cloned();
        loop {
            while let Some(head_key) = state.further_values.front().map(|e| e.key()) {
                if head_key > key {
                    return Ok(last);
                }
                let Some(head) = state.further_values.pop_front() else {
                    break;
                };
                if let Some(previous) = state.last_values_from_further_values.newest() {
                    link_pair(previous, &head);
                    let distance = head.key().duration_since(previous.key());
                    state.miss_counter.record_element_distance(distance);
                }
                self.index.put_entry(&head);
                state.last_values_from_further_values.push(head.clone());
                if head.key() == key {
                    return Ok(Some(head));
                }
                last = Some(head);
            }

            let Some(tail) = state.last_values_from_further_values.newest().map(|e| e.key()) else {
                return Ok(last);
            };
            let can_continue = tail < key
                && state.max_key_in_db.is_none_or(|m| tail < m)
                && state.last_load_start.is_none_or(|s| tail > s);
            if !can_continue {
                return Ok(last);
            }
            self.eventually_load_further_values(state, key, tail, true)?;
            if state.further_values.is_empty() {
                return Ok(last);
            }
        }
    }

    fn is_potentially_already_evicted(&self, state: &GapState<S::Value>, key: Timestamp, value: Option<&Entry<S>>) -> bool {
        match value {
            None => {
                state.min_key_in_db.is_some_and(|m| key > m)
                    || state.min_key_in_db_from_load_further_values.is_some_and(|m| key > m)
            },
            Some(found) => {
                let successor_unknown = found.next_key().flatten().is_none_or(|n| n <= key);
                state.further_values.is_empty()
                    && successor_unknown
                    && found.key() < key
                    && state.max_key_in_db.is_some_and(|m| found.key() < m)
            },
        }
    }
}

impl<S: HistoricalSource> std::fmt::Debug for GapFillEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GapFillEngine")
            .field("batch_size", &self.batch_size)
            .field("clear_requested", &self.clear_requested.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
