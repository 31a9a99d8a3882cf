// ==============================================
// CONCURRENCY TESTS (integration)
// ==============================================
//
// One cache shared across threads. Loads are serialized by the engine
// lock; range queries that find the window busy fall back to the uncached
// path. Every thread must still see the reference answer.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use histkit::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::{CountingSource, init_tracing, ts};

const THREADS: usize = 8;

fn shared_cache(strategy: QueryCoreStrategy, capacity: usize) -> (Arc<CountingSource>, Arc<HistoricalCache<CountingSource>>) {
    init_tracing();
    let keys = (0..2_000).map(|k| k * 7);
    let source = Arc::new(CountingSource::with_keys(keys));
    let cache = HistoricalCacheBuilder::new()
        .maximum_size(capacity)
        .query_core(strategy)
        .max_cached_window(64)
        .try_build_shared(source.clone())
        .unwrap();
    (source, Arc::new(cache))
}

// ==============================================
// Point queries
// ==============================================

mod point_queries {
    use super::*;

    #[test]
    fn parallel_gets_match_reference() {
        let (source, cache) = shared_cache(QueryCoreStrategy::Cached, 64);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = cache.clone();
                let source = source.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(t as u64);
                    barrier.wait();
                    for _ in 0..500 {
                        let key = rng.gen_range(-20i64..14_100);
                        let got = cache.get(ts(key)).unwrap().map(|tick| tick.at.as_millis());
                        assert_eq!(got, source.expected_at(key), "thread {t} key {key}");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        cache.check_invariants().unwrap();
    }

    #[test]
    fn clear_while_querying_keeps_answers_correct() {
        let (source, cache) = shared_cache(QueryCoreStrategy::Default, 32);
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = cache.clone();
                let source = source.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..300 {
                        let key = ((t * 997 + i * 31) % 14_000) as i64;
                        let got = cache.get(ts(key)).unwrap().map(|tick| tick.at.as_millis());
                        assert_eq!(got, source.expected_at(key));
                    }
                })
            })
            .collect();

        barrier.wait();
        for _ in 0..50 {
            cache.clear();
            thread::yield_now();
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

// ==============================================
// Range queries
// ==============================================

mod range_queries {
    use super::*;

    fn run_parallel_walks(strategy: QueryCoreStrategy) {
        let (_, cache) = shared_cache(strategy, 128);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let start = 700 * t as i64;
                    for step in 0..200i64 {
                        let key = start + step * 7 + 3;
                        let got = cache.get_previous_entries(ts(key), 5).unwrap();
                        let keys: Vec<i64> = got.iter().map(|e| e.key().as_millis()).collect();
                        let end = (key / 7) * 7;
                        let expected: Vec<i64> = (0..5).rev().map(|i| end - 7 * i).filter(|&k| k >= 0).collect();
                        assert_eq!(keys, expected, "{strategy:?} thread {t} key {key}");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        cache.check_invariants().unwrap();
    }

    #[test]
    fn parallel_walks_cached() {
        run_parallel_walks(QueryCoreStrategy::Cached);
    }

    #[test]
    fn parallel_walks_trailing() {
        run_parallel_walks(QueryCoreStrategy::Trailing);
    }

    #[test]
    fn cache_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HistoricalCache<CountingSource>>();
    }
}
