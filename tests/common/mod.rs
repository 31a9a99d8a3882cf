// ==============================================
// SHARED TEST SOURCE (integration)
// ==============================================
//
// BTreeMap-backed source that counts calls to both read primitives so
// tests can assert when the cache did or did not reach the store.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing_subscriber::EnvFilter;

use histkit::source::{AscendingValues, HistoricalSource};
use histkit::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub at: Timestamp,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDown;

impl fmt::Display for StoreDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("store unavailable")
    }
}

impl std::error::Error for StoreDown {}

#[derive(Debug, Default)]
pub struct CountingSource {
    ticks: RwLock<BTreeMap<Timestamp, Tick>>,
    latest_calls: AtomicUsize,
    ascending_calls: AtomicUsize,
    down: AtomicBool,
}

pub fn ts(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

/// Price stored at `key`; each test can derive expectations from keys.
pub fn price_at(key: i64) -> i64 {
    key * 100 + 7
}

impl CountingSource {
    pub fn with_keys(keys: impl IntoIterator<Item = i64>) -> Self {
        let source = Self::default();
        for key in keys {
            source.append(key);
        }
        source
    }

    pub fn append(&self, key: i64) {
        let at = ts(key);
        self.ticks.write().insert(
            at,
            Tick {
                at,
                price: price_at(key),
            },
        );
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn ascending_calls(&self) -> usize {
        self.ascending_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.latest_calls() + self.ascending_calls()
    }

    /// Reference answer: greatest key `<= key`, else the earliest key.
    pub fn expected_at(&self, key: i64) -> Option<i64> {
        let ticks = self.ticks.read();
        ticks
            .range(..=ts(key))
            .next_back()
            .or_else(|| ticks.iter().next())
            .map(|(k, _)| k.as_millis())
    }

    pub fn keys(&self) -> Vec<i64> {
        self.ticks.read().keys().map(|k| k.as_millis()).collect()
    }
}

impl HistoricalSource for CountingSource {
    type Value = Tick;
    type Error = StoreDown;

    fn extract_key(&self, value: &Tick) -> Timestamp {
        value.at
    }

    fn read_latest_value_for(&self, key: Timestamp) -> Result<Option<Tick>, StoreDown> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreDown);
        }
        Ok(self.ticks.read().range(..=key).next_back().map(|(_, t)| *t))
    }

    fn read_all_values_ascending_from(
        &self,
        key: Timestamp,
    ) -> Result<AscendingValues<'_, Tick, StoreDown>, StoreDown> {
        self.ascending_calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreDown);
        }
        let snapshot: Vec<Tick> = self.ticks.read().range(key..).map(|(_, t)| *t).collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }
}

/// Routes `tracing` output through the test harness. `RUST_LOG` selects levels.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
