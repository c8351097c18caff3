// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::sync::Mutex;

use tracing::warn;

use crate::bits::BitVec;
use crate::config::FilterConfig;
use crate::counters::CounterVec;

/// A counting Bloom filter backed by an in-process bit array and
/// counter array.
///
/// One exclusive lock guards both arrays, so a bit is set exactly while
/// its counter is positive. All operations take `&self` and may be
/// called from multiple threads.
///
/// Counters saturate at `2^c - 1` for the configured width `c`; a
/// pinned counter no longer tracks further additions and the minimum
/// count estimate may underestimate from then on.
#[derive(Debug)]
pub struct CountingBloomFilter {
    config: FilterConfig,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    bits: BitVec,
    counters: CounterVec,
}

impl CountingBloomFilter {
    /// Creates an empty counting filter sized by `config`.
    pub fn new(config: FilterConfig) -> Self {
        let state = State {
            bits: BitVec::new(config.size()),
            counters: CounterVec::new(config.size(), config.counting_bits()),
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Inserts raw element bytes: sets the bit and increments the
    /// counter at each of the k positions.
    ///
    /// Returns the minimum post-increment counter across the positions,
    /// which estimates the element's current multiplicity.
    pub fn add(&self, element: &[u8]) -> u64 {
        let positions = self.positions(element);
        let mut state = self.state.lock().expect("filter lock poisoned");
        let mut minimum = u64::MAX;
        for &position in &positions {
            if state.counters.get(position) == state.counters.max_value() {
                warn!(position, "counter saturated, count estimates may underestimate");
            }
            let count = state.counters.increment(position);
            state.bits.set(position);
            minimum = minimum.min(count);
        }
        minimum
    }

    /// Inserts a string element (encoded as UTF-8 bytes).
    pub fn add_str(&self, element: &str) -> u64 {
        self.add(element.as_bytes())
    }

    /// Removes one occurrence of raw element bytes.
    ///
    /// Returns `true` iff this was the last occurrence, i.e. the
    /// minimum post-decrement counter reached zero.
    pub fn remove(&self, element: &[u8]) -> bool {
        self.remove_and_estimate_count(element) == 0
    }

    /// Removes one occurrence of a string element.
    pub fn remove_str(&self, element: &str) -> bool {
        self.remove(element.as_bytes())
    }

    /// Removes one occurrence and returns the minimum post-decrement
    /// counter across the k positions.
    pub fn remove_and_estimate_count(&self, element: &[u8]) -> u64 {
        let positions = self.positions(element);
        let mut state = self.state.lock().expect("filter lock poisoned");
        let mut minimum = u64::MAX;
        for &position in &positions {
            let count = state.counters.decrement(position);
            if count == 0 {
                state.bits.clear_bit(position);
            }
            minimum = minimum.min(count);
        }
        minimum
    }

    /// Returns the minimum counter across the element's k positions,
    /// an upper-biased estimate of its multiplicity.
    pub fn estimated_count(&self, element: &[u8]) -> u64 {
        let positions = self.positions(element);
        let state = self.state.lock().expect("filter lock poisoned");
        positions
            .iter()
            .map(|&p| state.counters.get(p))
            .min()
            .unwrap_or(0)
    }

    /// String form of [`estimated_count`](Self::estimated_count).
    pub fn estimated_count_str(&self, element: &str) -> u64 {
        self.estimated_count(element.as_bytes())
    }

    /// Tests whether raw element bytes are possibly in the set.
    pub fn contains(&self, element: &[u8]) -> bool {
        let positions = self.positions(element);
        let state = self.state.lock().expect("filter lock poisoned");
        positions.iter().all(|&p| state.bits.get(p))
    }

    /// Tests whether a string element is possibly in the set.
    pub fn contains_str(&self, element: &str) -> bool {
        self.contains(element.as_bytes())
    }

    /// Returns whether no element is currently counted.
    pub fn is_empty(&self) -> bool {
        self.state
            .lock()
            .expect("filter lock poisoned")
            .counters
            .is_empty()
    }

    /// Returns the number of set bits.
    pub fn population(&self) -> u64 {
        self.state
            .lock()
            .expect("filter lock poisoned")
            .bits
            .cardinality()
    }

    /// Resets the filter to its initial empty state.
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("filter lock poisoned");
        state.bits.clear();
        state.counters.clear();
    }

    /// The configuration this filter was built with.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn positions(&self, element: &[u8]) -> Vec<u64> {
        self.config
            .hash_method()
            .positions(element, self.config.size(), self.config.hashes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(n: u64, p: f64) -> CountingBloomFilter {
        CountingBloomFilter::new(FilterConfig::new(n, p).unwrap())
    }

    #[test]
    fn test_add_returns_multiplicity() {
        let filter = filter(100, 0.01);
        assert_eq!(filter.add_str("apple"), 1);
        assert_eq!(filter.add_str("apple"), 2);
        assert_eq!(filter.add_str("apple"), 3);
        assert_eq!(filter.estimated_count_str("apple"), 3);
    }

    #[test]
    fn test_remove_last_occurrence() {
        let filter = filter(100, 0.01);
        filter.add_str("apple");
        filter.add_str("apple");

        assert!(!filter.remove_str("apple"));
        assert!(filter.contains_str("apple"));
        assert!(filter.remove_str("apple"));
        assert!(!filter.contains_str("apple"));
    }

    #[test]
    fn test_remove_and_estimate_count() {
        let filter = filter(100, 0.01);
        filter.add_str("apple");
        filter.add_str("apple");
        filter.add_str("apple");
        assert_eq!(filter.remove_and_estimate_count(b"apple"), 2);
        assert_eq!(filter.remove_and_estimate_count(b"apple"), 1);
        assert_eq!(filter.remove_and_estimate_count(b"apple"), 0);
    }

    #[test]
    fn test_remove_absent_element_is_benign() {
        let filter = filter(100, 0.01);
        assert!(filter.remove_str("ghost"));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_bit_and_counter_consistency() {
        let filter = filter(100, 0.01);
        filter.add_str("a");
        filter.add_str("b");
        filter.remove_str("a");
        // b must survive a's removal even where positions overlap.
        assert!(filter.contains_str("b"));
        filter.remove_str("b");
        assert!(filter.is_empty());
        assert_eq!(filter.population(), 0);
    }

    #[test]
    fn test_balanced_adds_and_removes_empty_the_filter() {
        let filter = filter(100, 0.01);
        let elements = ["a", "b", "c", "d", "e"];
        for element in &elements {
            filter.add_str(element);
            filter.add_str(element);
        }
        for element in &elements {
            filter.remove_str(element);
            filter.remove_str(element);
        }
        assert!(filter.is_empty());
    }

    #[test]
    fn test_saturation_pins_counts() {
        let config = FilterConfig::builder()
            .expected_elements(10)
            .false_positive_probability(0.1)
            .counting_bits(4)
            .build()
            .unwrap();
        let filter = CountingBloomFilter::new(config);
        for _ in 0..100 {
            filter.add_str("pinned");
        }
        assert_eq!(filter.estimated_count_str("pinned"), 15);
        assert_eq!(filter.add_str("pinned"), 15);
    }

    #[test]
    fn test_clear() {
        let filter = filter(100, 0.01);
        filter.add_str("apple");
        filter.clear();
        assert!(filter.is_empty());
        assert!(!filter.contains_str("apple"));
    }
}
