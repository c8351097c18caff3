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

use crate::bits::BitVec;
use crate::config::FilterConfig;
use crate::error::Error;

/// A Bloom filter for probabilistic set membership testing.
///
/// Provides fast membership queries with:
/// - No false negatives (inserted items always return `true`)
/// - Tunable false positive rate
/// - Constant space usage
///
/// Construct with a completed [`FilterConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilter {
    config: FilterConfig,
    bits: BitVec,
}

impl BloomFilter {
    /// Creates an empty filter sized by `config`.
    pub fn new(config: FilterConfig) -> Self {
        let bits = BitVec::new(config.size());
        Self { config, bits }
    }

    /// Reconstructs a filter from a configuration and a serialized bit
    /// array (wire order per [`BitVec`]).
    pub fn from_bytes(config: FilterConfig, bytes: &[u8]) -> Result<Self, Error> {
        let bits = BitVec::from_bytes(bytes, config.size())?;
        Ok(Self { config, bits })
    }

    // ========================================================================
    // Query and Update Operations
    // ========================================================================

    /// Inserts raw element bytes.
    ///
    /// Returns `true` when the filter changed, i.e. the element was not
    /// (possibly) present before.
    pub fn add(&mut self, element: &[u8]) -> bool {
        let mut changed = false;
        for position in self.positions(element) {
            if !self.bits.set(position) {
                changed = true;
            }
        }
        changed
    }

    /// Inserts a string element (encoded as UTF-8 bytes).
    pub fn add_str(&mut self, element: &str) -> bool {
        self.add(element.as_bytes())
    }

    /// Tests whether raw element bytes are possibly in the set.
    ///
    /// Returns:
    /// - `true`: element was **possibly** inserted (or false positive)
    /// - `false`: element was **definitely not** inserted
    pub fn contains(&self, element: &[u8]) -> bool {
        self.positions(element).iter().all(|&p| self.bits.get(p))
    }

    /// Tests whether a string element is possibly in the set.
    pub fn contains_str(&self, element: &str) -> bool {
        self.contains(element.as_bytes())
    }

    /// Resets the filter to its initial empty state.
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    // ========================================================================
    // Set Operations
    // ========================================================================

    /// Merges another filter into this one via bitwise OR (union).
    ///
    /// After merging, this filter recognizes items from either filter
    /// (plus any false positives from either).
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleFilters` when the configurations differ in
    /// size, hash count, hash family, or charset.
    pub fn union(&mut self, other: &BloomFilter) -> Result<(), Error> {
        self.check_compatible(other)?;
        self.bits.or_assign(&other.bits);
        Ok(())
    }

    /// Intersects this filter with another via bitwise AND.
    ///
    /// After intersection, this filter recognizes only items present in
    /// both filters (plus false positives).
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleFilters` when the configurations differ in
    /// size, hash count, hash family, or charset.
    pub fn intersect(&mut self, other: &BloomFilter) -> Result<(), Error> {
        self.check_compatible(other)?;
        self.bits.and_assign(&other.bits);
        Ok(())
    }

    fn check_compatible(&self, other: &BloomFilter) -> Result<(), Error> {
        if self.config.is_compatible(&other.config) {
            Ok(())
        } else {
            Err(Error::incompatible("filters address different bit spaces")
                .with_context("left_size", self.config.size())
                .with_context("right_size", other.config.size())
                .with_context("left_method", self.config.hash_method())
                .with_context("right_method", other.config.hash_method()))
        }
    }

    // ========================================================================
    // Statistics and Properties
    // ========================================================================

    /// Returns whether the filter is empty (no items inserted).
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns the number of bits set to 1.
    pub fn population(&self) -> u64 {
        self.bits.cardinality()
    }

    /// Returns the current load factor (fraction of bits set).
    pub fn load_factor(&self) -> f64 {
        self.population() as f64 / self.config.size() as f64
    }

    /// Estimates the current false positive probability from the load
    /// factor, assuming uniform bit distribution.
    pub fn estimated_fpp(&self) -> f64 {
        let k = self.config.hashes() as f64;
        let load = self.load_factor();
        (1.0 - (-k * load).exp()).powf(k)
    }

    /// The configuration this filter was built with.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// The underlying bit vector.
    pub fn bit_vec(&self) -> &BitVec {
        &self.bits
    }

    fn positions(&self, element: &[u8]) -> Vec<u64> {
        self.config
            .hash_method()
            .positions(element, self.config.size(), self.config.hashes())
    }
}
