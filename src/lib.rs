//! histkit: a gap-filling read-through cache for time-indexed history.
//!
//! Point queries resolve the value in effect at a timestamp; range queries
//! return the entries trailing or following it. Every lookup that has to
//! reach the backing store scans forward through an ascending buffer and
//! caches each value it passes, so nearby queries are usually served
//! without another read.
//!
//! See `DESIGN.md` for the grounding of each module and the decisions on
//! ambiguous behavior.

pub mod builder;
pub mod cache;
pub mod config;
pub mod ds;
pub mod entry;
pub mod error;
pub mod gap;
pub mod index;
pub mod lookup;
pub mod query;
pub mod source;
pub mod time;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;

#[cfg(test)]
pub(crate) mod test_support;
