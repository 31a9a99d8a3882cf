//! Ordered instants used as cache keys.
//!
//! [`Timestamp`] is a millisecond-resolution instant since the Unix epoch.
//! The [`Timestamp::MIN`] and [`Timestamp::MAX`] sentinels stand for "before
//! all data" and "after all data" and are what the gap-filling engine hands
//! to [`HistoricalSource::read_latest_value_for`] when it probes the bounds
//! of the backing store.
//!
//! Arithmetic saturates at the sentinels, so `Timestamp::MIN - step` stays
//! `Timestamp::MIN` instead of wrapping.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use histkit::time::Timestamp;
//!
//! let t = Timestamp::from_millis(1_000);
//! assert_eq!(t.saturating_sub(Duration::from_millis(250)), Timestamp::from_millis(750));
//! assert_eq!(t.next(), Timestamp::from_millis(1_001));
//! assert_eq!(Timestamp::MIN.saturating_sub(Duration::from_secs(1)), Timestamp::MIN);
//! ```
//!
//! [`HistoricalSource::read_latest_value_for`]: crate::source::HistoricalSource::read_latest_value_for

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Millisecond instant since the Unix epoch, totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel ordered before every real instant.
    pub const MIN: Timestamp = Timestamp(i64::MIN);
    /// Sentinel ordered after every real instant.
    pub const MAX: Timestamp = Timestamp(i64::MAX);

    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    #[inline]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Utc::now().into()
    }

    /// Returns `true` for [`Timestamp::MIN`] and [`Timestamp::MAX`].
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        self.0 == i64::MIN || self.0 == i64::MAX
    }

    /// The instant one tick (millisecond) earlier.
    #[inline]
    pub const fn prev(self) -> Self {
        Timestamp(self.0.saturating_sub(1))
    }

    /// The instant one tick (millisecond) later.
    #[inline]
    pub const fn next(self) -> Self {
        Timestamp(self.0.saturating_add(1))
    }

    pub fn saturating_sub(self, step: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration_millis(step)))
    }

    pub fn saturating_add(self, step: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration_millis(step)))
    }

    /// Distance from `earlier` to `self`, or zero if `earlier` is not earlier.
    pub fn duration_since(self, earlier: Timestamp) -> Duration {
        if self.0 <= earlier.0 {
            return Duration::ZERO;
        }
        let diff = (self.0 as i128 - earlier.0 as i128).min(u64::MAX as i128);
        Duration::from_millis(diff as u64)
    }

    /// Converts to a chrono instant; `None` when outside chrono's range
    /// (always the case for the sentinels).
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_sentinel() {
            return None;
        }
        Utc.timestamp_millis_opt(self.0).single()
    }
}

fn duration_millis(step: Duration) -> i64 {
    i64::try_from(step.as_millis()).unwrap_or(i64::MAX)
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp(value.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Timestamp::MIN => f.write_str("MIN"),
            Timestamp::MAX => f.write_str("MAX"),
            other => match other.to_datetime() {
                Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
                None => write!(f, "{}ms", other.0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_bracket_real_instants() {
        let t = Timestamp::from_millis(0);
        assert!(Timestamp::MIN < t);
        assert!(t < Timestamp::MAX);
        assert!(Timestamp::MIN.is_sentinel());
        assert!(!t.is_sentinel());
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(Timestamp::MAX.next(), Timestamp::MAX);
        assert_eq!(Timestamp::MIN.prev(), Timestamp::MIN);
        assert_eq!(
            Timestamp::MAX.saturating_add(Duration::from_secs(10)),
            Timestamp::MAX
        );
        assert_eq!(
            Timestamp::from_millis(5).saturating_sub(Duration::MAX),
            Timestamp::MIN
        );
    }

    #[test]
    fn duration_since_is_zero_for_later_origin() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(40);
        assert_eq!(a.duration_since(b), Duration::from_millis(60));
        assert_eq!(b.duration_since(a), Duration::ZERO);
        assert_eq!(
            Timestamp::MAX.duration_since(Timestamp::MIN),
            Duration::from_millis(u64::MAX)
        );
    }

    #[test]
    fn chrono_round_trip_and_display() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let t = Timestamp::from(dt);
        assert_eq!(t.to_datetime(), Some(dt));
        assert_eq!(t.to_string(), "2024-03-01T12:00:00.000Z");
        assert_eq!(Timestamp::MIN.to_string(), "MIN");
        assert_eq!(Timestamp::MAX.to_datetime(), None);
    }
}
