#![no_main]

use std::sync::Arc;

use histkit::entry::HistoricalEntry;
use histkit::index::LruIndex;
use histkit::time::Timestamp;
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary operation sequences on LruIndex
//
// Tests random sequences of insert, get, peek, remove, pop_lru,
// set_capacity and clear, checking invariants after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let mut index = LruIndex::new(usize::from(data[0] % 32));

    for pair in data[1..].chunks_exact(2) {
        let key = Timestamp::from_millis(i64::from(pair[1]));
        match pair[0] % 7 {
            0 | 1 => {
                let entry = Arc::new(HistoricalEntry::new(key, u64::from(pair[1])));
                index.insert(key, entry);
                if index.capacity() > 0 {
                    assert!(index.contains(&key));
                }
            },
            2 => {
                if let Some(entry) = index.get(&key) {
                    assert_eq!(entry.key(), key);
                }
            },
            3 => {
                let before = index.len();
                if index.remove(&key).is_some() {
                    assert_eq!(index.len(), before - 1);
                }
                assert!(!index.contains(&key));
            },
            4 => {
                let lru = index.peek_lru().map(|(k, _)| k);
                assert_eq!(index.pop_lru().map(|(k, _)| k), lru);
            },
            5 => {
                let evicted = index.set_capacity(usize::from(pair[1] % 24));
                assert!(index.len() <= index.capacity());
                let _ = evicted;
            },
            _ => {
                index.clear();
                assert!(index.is_empty());
            },
        }
        assert!(index.len() <= index.capacity());
        index.check_invariants().unwrap();
    }
});
