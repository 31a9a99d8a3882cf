pub use crate::builder::HistoricalCacheBuilder;
pub use crate::cache::HistoricalCache;
pub use crate::config::{HistoricalCacheConfig, QueryCoreStrategy};
pub use crate::entry::{EntryRef, HistoricalEntry};
pub use crate::error::{ConfigError, HistoricalError, HistoricalResult, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::HistoricalMetricsSnapshot;
pub use crate::query::{CachedQueryCore, DefaultQueryCore, QueryCore, TrailingQueryCore};
pub use crate::source::{AscendingValues, HistoricalSource};
pub use crate::time::Timestamp;
