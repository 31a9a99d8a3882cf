//! The capability interface a backing store implements.
//!
//! The cache never talks to a database directly. It is handed a
//! [`HistoricalSource`] at construction and uses exactly two read
//! primitives plus a pure key extractor:
//!
//! | Method                              | Meaning                                          |
//! |-------------------------------------|--------------------------------------------------|
//! | `read_latest_value_for(key)`        | nearest value at or before `key`                 |
//! | `read_all_values_ascending_from(k)` | ascending values with keys `>= k`                |
//! | `extract_key(&value)`               | the key a value is stored under (pure, stable)   |
//! | `highest_allowed_key()`             | optional cheap upper bound, skips a max probe    |
//! | `is_already_adjusting_key()`        | `true` while that bound is being recomputed      |
//!
//! Sources must only ever append at the high end. Mutating history that was
//! already read is not detected and leads to stale answers.
//!
//! Sources must not call back into the cache that owns them from inside
//! either read primitive: the gap-filling engine holds its lock while it
//! reads.

use crate::time::Timestamp;

/// Boxed ascending value stream returned by
/// [`HistoricalSource::read_all_values_ascending_from`].
pub type AscendingValues<'a, V, E> = Box<dyn Iterator<Item = Result<V, E>> + 'a>;

/// Read access to an append-mostly, time-indexed store.
pub trait HistoricalSource: Send + Sync {
    type Value: Clone + Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Key under which `value` is stored. Must be pure.
    fn extract_key(&self, value: &Self::Value) -> Timestamp;

    /// Nearest value at or before `key`; `None` if there is none.
    ///
    /// A source may instead return its earliest value when nothing precedes
    /// `key`. With `key = Timestamp::MAX` this is the newest value.
    fn read_latest_value_for(&self, key: Timestamp) -> Result<Option<Self::Value>, Self::Error>;

    /// Values with keys `>= key` in ascending order. An empty stream means
    /// there is no more data in that direction. The cache only consumes a
    /// bounded prefix per call.
    fn read_all_values_ascending_from(
        &self,
        key: Timestamp,
    ) -> Result<AscendingValues<'_, Self::Value, Self::Error>, Self::Error>;

    /// Cheap hint for the highest key currently present.
    fn highest_allowed_key(&self) -> Option<Timestamp> {
        None
    }

    /// Whether [`HistoricalSource::highest_allowed_key`] is mid-update and
    /// should not be trusted right now.
    fn is_already_adjusting_key(&self) -> bool {
        false
    }
}
