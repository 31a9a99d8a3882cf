//! Observational counters for a historical cache (feature `metrics`).
//!
//! Counters are plain integers updated under the lock that already guards
//! the state they describe: [`GapMetrics`] lives inside the gap-filling
//! engine's state, [`WindowMetrics`] inside a query core's cached window.
//! Fallbacks to the uncached path happen precisely when that lock is
//! unavailable, so query cores count those in an atomic instead.
//! [`HistoricalMetricsSnapshot`] gathers both plus index gauges.
//!
//! Metrics never influence cache behavior.

/// Point-in-time copy of every counter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalMetricsSnapshot {
    pub load_calls: u64,
    pub fast_path_hits: u64,
    pub further_value_loads: u64,
    pub ascending_reads: u64,
    pub latest_reads: u64,
    pub eviction_retries: u64,
    pub last_resort_reads: u64,
    pub capacity_increases: u64,
    pub clears_applied: u64,

    pub window_hits: u64,
    pub window_replacements: u64,
    pub window_resets: u64,
    pub uncached_fallbacks: u64,

    // gauges captured at snapshot time
    pub index_len: usize,
    pub index_capacity: usize,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct GapMetrics {
    pub load_calls: u64,
    pub fast_path_hits: u64,
    pub further_value_loads: u64,
    pub ascending_reads: u64,
    pub latest_reads: u64,
    pub eviction_retries: u64,
    pub last_resort_reads: u64,
    pub capacity_increases: u64,
    pub clears_applied: u64,
}

impl GapMetrics {
    pub fn write_into(&self, snapshot: &mut HistoricalMetricsSnapshot) {
        snapshot.load_calls = self.load_calls;
        snapshot.fast_path_hits = self.fast_path_hits;
        snapshot.further_value_loads = self.further_value_loads;
        snapshot.ascending_reads = self.ascending_reads;
        snapshot.latest_reads = self.latest_reads;
        snapshot.eviction_retries = self.eviction_retries;
        snapshot.last_resort_reads = self.last_resort_reads;
        snapshot.capacity_increases = self.capacity_increases;
        snapshot.clears_applied = self.clears_applied;
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct WindowMetrics {
    pub window_hits: u64,
    pub window_replacements: u64,
    pub window_resets: u64,
}

impl WindowMetrics {
    pub fn write_into(&self, snapshot: &mut HistoricalMetricsSnapshot) {
        snapshot.window_hits = self.window_hits;
        snapshot.window_replacements = self.window_replacements;
        snapshot.window_resets = self.window_resets;
    }
}
