#![no_main]

use std::collections::BTreeMap;
use std::convert::Infallible;

use histkit::prelude::*;
use libfuzzer_sys::fuzz_target;

struct Series(BTreeMap<Timestamp, i64>);

impl HistoricalSource for Series {
    type Value = (Timestamp, i64);
    type Error = Infallible;

    fn extract_key(&self, value: &Self::Value) -> Timestamp {
        value.0
    }

    fn read_latest_value_for(&self, key: Timestamp) -> Result<Option<Self::Value>, Infallible> {
        Ok(self.0.range(..=key).next_back().map(|(k, v)| (*k, *v)))
    }

    fn read_all_values_ascending_from(
        &self,
        key: Timestamp,
    ) -> Result<AscendingValues<'_, Self::Value, Infallible>, Infallible> {
        Ok(Box::new(self.0.range(key..).map(|(k, v)| Ok((*k, *v)))))
    }
}

impl Series {
    fn expected(&self, key: Timestamp) -> Option<Timestamp> {
        self.0
            .range(..=key)
            .next_back()
            .or_else(|| self.0.iter().next())
            .map(|(k, _)| *k)
    }
}

// Fuzz arbitrary sequences of point queries, range queries, clears and
// resizes against a reference BTreeMap.
//
// Byte 0 picks the query core and index capacity, the next 32 bytes seed
// the stored keys, the rest is an op stream of (op, key) pairs.
fuzz_target!(|data: &[u8]| {
    if data.len() < 34 {
        return;
    }

    let strategy = match data[0] % 3 {
        0 => QueryCoreStrategy::Default,
        1 => QueryCoreStrategy::Cached,
        _ => QueryCoreStrategy::Trailing,
    };
    let capacity = usize::from(data[0] / 3 % 16) + 1;

    let mut keys = BTreeMap::new();
    for &b in &data[1..33] {
        let k = Timestamp::from_millis(i64::from(b) * 4);
        keys.insert(k, i64::from(b));
    }
    let series = Series(keys);
    let reference = Series(series.0.clone());

    let cache = HistoricalCacheBuilder::new()
        .maximum_size(capacity)
        .further_values_batch_size(4)
        .read_back_step(std::time::Duration::from_millis(16))
        .max_cached_window(8)
        .query_core(strategy)
        .build(series);

    for pair in data[33..].chunks_exact(2) {
        let key = Timestamp::from_millis(i64::from(pair[1]) * 4 - 20);
        match pair[0] % 5 {
            0 | 1 => {
                let got = cache.get_entry(key).unwrap().map(|e| e.key());
                assert_eq!(got, reference.expected(key));
            },
            2 => {
                let n = usize::from(pair[0] / 5 % 12);
                let got = cache.get_previous_entries(key, n).unwrap();
                assert!(got.len() <= n);
                assert!(got.windows(2).all(|w| w[0].key() < w[1].key()));
                if let Some(last) = got.last() {
                    assert!(last.key() <= key);
                }
            },
            3 => {
                let n = usize::from(pair[0] / 5 % 12);
                let got = cache.get_next_entries(key, n).unwrap();
                assert!(got.windows(2).all(|w| w[0].key() < w[1].key()));
                assert!(got.first().is_none_or(|e| e.key() >= key));
            },
            _ => {
                if pair[0] & 0x80 == 0 {
                    cache.clear();
                } else {
                    cache.set_maximum_size(usize::from(pair[0] % 7) + 1);
                }
            },
        }
        cache.check_invariants().unwrap();
    }
});
