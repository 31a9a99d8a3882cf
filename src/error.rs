//! Error types for the histkit library.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: An internal-consistency violation, e.g. buffered
//!   further values that are not strictly ascending, or a cached window that
//!   stays inconsistent after one reset. Always fatal.
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero capacity, a capacity above the configured limit).
//! - [`HistoricalError`]: What every query returns on failure: either an
//!   invariant violation or the backing source's own error, unchanged.
//!
//! ## Example Usage
//!
//! ```
//! use histkit::config::HistoricalCacheConfig;
//! use histkit::error::ConfigError;
//!
//! let ok: Result<(), ConfigError> = HistoricalCacheConfig::default().validate();
//! assert!(ok.is_ok());
//!
//! let bad = HistoricalCacheConfig::default().with_maximum_size(0).validate();
//! assert!(bad.unwrap_err().to_string().contains("maximum_size"));
//! ```

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed. Seeing
/// one usually means the backing source broke the append-only contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`HistoricalCacheConfig::validate`](crate::config::HistoricalCacheConfig::validate)
/// and [`HistoricalCacheBuilder::try_build`](crate::builder::HistoricalCacheBuilder::try_build).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// HistoricalError
// ---------------------------------------------------------------------------

/// Failure of a point or range query.
///
/// `E` is the backing source's error type. Source errors pass through
/// untouched; this layer never retries I/O.
#[derive(Debug, Error)]
pub enum HistoricalError<E>
where
    E: std::error::Error + 'static,
{
    /// Internal consistency could not be restored.
    #[error("internal consistency violated: {0}")]
    Consistency(#[from] InvariantError),

    /// The backing source failed.
    #[error("backing source failed: {0}")]
    Source(#[source] E),
}

impl<E> HistoricalError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_consistency(&self) -> bool {
        matches!(self, HistoricalError::Consistency(_))
    }

    /// The source error, if this is one.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            HistoricalError::Source(err) => Some(err),
            HistoricalError::Consistency(_) => None,
        }
    }
}

/// Result alias for cache queries over a source with error type `E`.
pub type HistoricalResult<T, E> = Result<T, HistoricalError<E>>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct DiskError;

    impl fmt::Display for DiskError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk unavailable")
        }
    }

    impl std::error::Error for DiskError {}

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("further values not ascending");
        assert_eq!(err.to_string(), "further values not ascending");
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InvariantError>();
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("maximum_size must be > 0");
        assert_eq!(err.to_string(), "maximum_size must be > 0");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    // -- HistoricalError --------------------------------------------------

    #[test]
    fn consistency_converts_from_invariant() {
        let err: HistoricalError<DiskError> = InvariantError::new("window mismatch").into();
        assert!(err.is_consistency());
        assert!(err.source_error().is_none());
        assert_eq!(
            err.to_string(),
            "internal consistency violated: window mismatch"
        );
    }

    #[test]
    fn source_error_passes_through() {
        let err: HistoricalError<DiskError> = HistoricalError::Source(DiskError);
        assert!(!err.is_consistency());
        assert_eq!(err.source_error(), Some(&DiskError));
        assert_eq!(err.to_string(), "backing source failed: disk unavailable");

        use std::error::Error as _;
        assert!(err.source().is_some());
    }
}
