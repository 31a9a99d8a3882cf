//! Adaptive tuning of the read-back step and index capacity.
//!
//! The gap-filling engine reads ascending values starting `read_back_step`
//! before a requested key. Too short a step and the load misses the value
//! effective at the key; too long and it buffers values nobody asks for.
//! [`MissCounter`] watches what loads actually return and nudges the step:
//!
//! - a load that found nothing at or before the key doubles the step;
//! - a load that buffered more than [`DENSE_LOAD_ELEMENTS`] values behind
//!   the key shrinks the step to the span of the last ten, floored at twice
//!   the largest recent distance between consecutive values.
//!
//! Separately, successive suspected evictions ask the owning cache for a
//! larger index, doubling up to the configured limit.
//!
//! Tuning describes the data's density, not the cache contents, so it
//! survives `clear()`.

use std::time::Duration;

/// Loads with more values than this behind the requested key count as
/// over-fetching.
pub const DENSE_LOAD_ELEMENTS: usize = 10;

const MIN_READ_BACK_STEP: Duration = Duration::from_millis(1);
const MAX_READ_BACK_GROWTH: u32 = 64;
/// Weight of the previous value when decaying the element distance.
const DISTANCE_DECAY: u32 = 16;

#[derive(Debug, Clone)]
pub struct MissCounter {
    initial_read_back_step: Duration,
    optimal_read_back_step: Duration,
    element_distance: Duration,
    successive_misses: u32,
    successive_miss_threshold: u32,
    maximum_size_limit: usize,
}

impl MissCounter {
    pub fn new(read_back_step: Duration, successive_miss_threshold: u32, maximum_size_limit: usize) -> Self {
        Self {
            initial_read_back_step: read_back_step,
            optimal_read_back_step: read_back_step,
            element_distance: Duration::ZERO,
            successive_misses: 0,
            successive_miss_threshold: successive_miss_threshold.max(1),
            maximum_size_limit,
        }
    }

    pub fn optimal_read_back_step(&self) -> Duration {
        self.optimal_read_back_step
    }

    /// Decayed maximum of distances between consecutive values.
    pub fn element_distance(&self) -> Duration {
        self.element_distance
    }

    pub fn successive_misses(&self) -> u32 {
        self.successive_misses
    }

    pub fn maximum_size_limit(&self) -> usize {
        self.maximum_size_limit
    }

    pub fn set_maximum_size_limit(&mut self, limit: usize) {
        self.maximum_size_limit = limit;
    }

    /// Records the distance between two consecutive values seen while
    /// gap filling.
    pub fn record_element_distance(&mut self, distance: Duration) {
        if distance >= self.element_distance {
            self.element_distance = distance;
        } else {
            let gap = self.element_distance - distance;
            self.element_distance -= gap / DISTANCE_DECAY;
        }
    }

    /// A load starting one step back found nothing at or before the key.
    pub fn record_read_back_too_short(&mut self) {
        let ceiling = self.initial_read_back_step.saturating_mul(MAX_READ_BACK_GROWTH);
        let grown = self.optimal_read_back_step.saturating_mul(2);
        self.optimal_read_back_step = grown.min(ceiling).max(MIN_READ_BACK_STEP);
    }

    /// A load buffered `behind_count` values before the key, the last
    /// [`DENSE_LOAD_ELEMENTS`] of which spanned `recent_span`.
    pub fn record_read_back_span(&mut self, behind_count: usize, recent_span: Duration) {
        if behind_count <= DENSE_LOAD_ELEMENTS {
            return;
        }
        let floor = self.element_distance.saturating_mul(2).max(MIN_READ_BACK_STEP);
        let candidate = recent_span.max(floor);
        if candidate < self.optimal_read_back_step {
            self.optimal_read_back_step = candidate;
        }
    }

    /// A lookup was answered without suspecting an eviction.
    pub fn record_hit(&mut self) {
        self.successive_misses = 0;
    }

    /// A lookup suspected its value had been evicted. Returns the capacity
    /// the index should grow to, once the threshold of successive misses
    /// is reached and growth is still possible.
    pub fn record_potential_eviction(&mut self, current_size: usize) -> Option<usize> {
        self.successive_misses += 1;
        if self.successive_misses < self.successive_miss_threshold {
            return None;
        }
        self.successive_misses = 0;
        let target = current_size.saturating_mul(2).max(1).min(self.maximum_size_limit);
        (target > current_size).then_some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn counter() -> MissCounter {
        MissCounter::new(10 * DAY, 3, 10_000)
    }

    // ==============================================
    // Read-back step
    // ==============================================

    mod read_back_step {
        use super::*;

        #[test]
        fn starts_at_initial_step() {
            assert_eq!(counter().optimal_read_back_step(), 10 * DAY);
        }

        #[test]
        fn too_short_doubles() {
            let mut c = counter();
            c.record_read_back_too_short();
            assert_eq!(c.optimal_read_back_step(), 20 * DAY);
            c.record_read_back_too_short();
            assert_eq!(c.optimal_read_back_step(), 40 * DAY);
        }

        #[test]
        fn growth_is_capped() {
            let mut c = counter();
            for _ in 0..20 {
                c.record_read_back_too_short();
            }
            assert_eq!(c.optimal_read_back_step(), 640 * DAY);
        }

        #[test]
        fn dense_loads_shrink_the_step() {
            let mut c = counter();
            c.record_element_distance(Duration::from_secs(60));
            c.record_read_back_span(50, Duration::from_secs(600));
            assert_eq!(c.optimal_read_back_step(), Duration::from_secs(600));
        }

        #[test]
        fn sparse_loads_leave_the_step_alone() {
            let mut c = counter();
            c.record_read_back_span(DENSE_LOAD_ELEMENTS, Duration::from_secs(1));
            assert_eq!(c.optimal_read_back_step(), 10 * DAY);
        }

        #[test]
        fn shrink_is_floored_by_element_distance() {
            let mut c = counter();
            c.record_element_distance(DAY);
            c.record_read_back_span(50, Duration::from_secs(1));
            assert_eq!(c.optimal_read_back_step(), 2 * DAY);
        }
    }

    // ==============================================
    // Element distance
    // ==============================================

    mod element_distance {
        use super::*;

        #[test]
        fn tracks_maximum_and_decays() {
            let mut c = counter();
            c.record_element_distance(Duration::from_secs(160));
            assert_eq!(c.element_distance(), Duration::from_secs(160));
            c.record_element_distance(Duration::ZERO);
            assert_eq!(c.element_distance(), Duration::from_secs(150));
        }
    }

    // ==============================================
    // Capacity requests
    // ==============================================

    mod capacity {
        use super::*;

        #[test]
        fn grows_after_threshold() {
            let mut c = counter();
            assert_eq!(c.record_potential_eviction(100), None);
            assert_eq!(c.record_potential_eviction(100), None);
            assert_eq!(c.record_potential_eviction(100), Some(200));
            assert_eq!(c.successive_misses(), 0);
        }

        #[test]
        fn hit_resets_streak() {
            let mut c = counter();
            c.record_potential_eviction(100);
            c.record_potential_eviction(100);
            c.record_hit();
            assert_eq!(c.record_potential_eviction(100), None);
        }

        #[test]
        fn respects_limit() {
            let mut c = MissCounter::new(DAY, 1, 150);
            assert_eq!(c.record_potential_eviction(100), Some(150));
            assert_eq!(c.record_potential_eviction(150), None);
        }
    }
}
