//! In-memory source used by unit tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::source::{AscendingValues, HistoricalSource};
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub at: Timestamp,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryError;

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory source failure")
    }
}

impl std::error::Error for MemoryError {}

/// `BTreeMap`-backed source that counts every read.
#[derive(Debug, Default)]
pub struct MemorySource {
    points: RwLock<BTreeMap<Timestamp, Point>>,
    latest_reads: AtomicUsize,
    ascending_reads: AtomicUsize,
    failing: AtomicBool,
}

pub fn ts(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

impl MemorySource {
    pub fn with_keys(keys: &[i64]) -> Self {
        let source = Self::default();
        for &k in keys {
            source.append(k, k * 10);
        }
        source
    }

    pub fn append(&self, key: i64, value: i64) {
        let at = ts(key);
        self.points.write().insert(at, Point { at, value });
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn latest_reads(&self) -> usize {
        self.latest_reads.load(Ordering::SeqCst)
    }

    pub fn ascending_reads(&self) -> usize {
        self.ascending_reads.load(Ordering::SeqCst)
    }

    pub fn total_reads(&self) -> usize {
        self.latest_reads() + self.ascending_reads()
    }

    fn check(&self) -> Result<(), MemoryError> {
        if self.failing.load(Ordering::SeqCst) { Err(MemoryError) } else { Ok(()) }
    }
}

impl HistoricalSource for MemorySource {
    type Value = Point;
    type Error = MemoryError;

    fn extract_key(&self, value: &Point) -> Timestamp {
        value.at
    }

    fn read_latest_value_for(&self, key: Timestamp) -> Result<Option<Point>, MemoryError> {
        self.latest_reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let points = self.points.read();
        Ok(points.range(..=key).next_back().map(|(_, p)| *p))
    }

    fn read_all_values_ascending_from(
        &self,
        key: Timestamp,
    ) -> Result<AscendingValues<'_, Point, MemoryError>, MemoryError> {
        self.ascending_reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let snapshot: Vec<Point> = self.points.read().range(key..).map(|(_, p)| *p).collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }
}
