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

//! Filter configuration and parameter derivation.
//!
//! A [`FilterConfig`] is a completed tuple of expected element count `n`,
//! bit array size `m`, hash count `k`, and false-positive probability
//! `p`. Callers supply any sufficient subset through the builder; the
//! remaining quantities are derived from the standard optimality
//! relations:
//!
//! - `k* = (m/n) * ln 2`
//! - `m* = -n * ln p / (ln 2)^2`
//! - `p(m,n,k) = (1 - e^(-k*n/m))^k`
//!
//! # Usage
//!
//! ```rust
//! use cachesketch::config::FilterConfig;
//!
//! let config = FilterConfig::builder()
//!     .expected_elements(10_000)
//!     .false_positive_probability(0.01)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.size(), 95_851);
//! assert_eq!(config.hashes(), 7);
//! ```

use std::f64::consts::LN_2;

use crate::counters::VALID_COUNTER_WIDTHS;
use crate::error::Error;
use crate::hash::HashMethod;

/// Counter width used when none is configured.
pub const DEFAULT_COUNTING_BITS: u8 = 16;

/// False-positive target used when only `m` and `k` are supplied.
pub const DEFAULT_FALSE_POSITIVE_PROBABILITY: f64 = 0.01;

/// Character encoding recorded when none is configured.
pub const DEFAULT_CHARSET: &str = "UTF-8";

const DEFAULT_HASH_METHOD: HashMethod = HashMethod::Md5;

/// A completed, mutually consistent filter configuration.
///
/// Use [`FilterConfig::builder`] to construct instances.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    expected_elements: u64,
    size: u64,
    hashes: u32,
    false_positive_probability: f64,
    hash_method: HashMethod,
    counting_bits: u8,
    charset: String,
}

impl FilterConfig {
    /// Returns a builder holding a partial configuration.
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }

    /// Completes a configuration from expected elements and target
    /// false-positive probability, the most common entry point.
    pub fn new(expected_elements: u64, false_positive_probability: f64) -> Result<Self, Error> {
        Self::builder()
            .expected_elements(expected_elements)
            .false_positive_probability(false_positive_probability)
            .build()
    }

    /// Expected number of distinct elements `n`.
    pub fn expected_elements(&self) -> u64 {
        self.expected_elements
    }

    /// Bit array length `m`.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of hash functions `k`.
    pub fn hashes(&self) -> u32 {
        self.hashes
    }

    /// False-positive probability `p` at the expected load.
    pub fn false_positive_probability(&self) -> f64 {
        self.false_positive_probability
    }

    /// The configured hash family.
    pub fn hash_method(&self) -> HashMethod {
        self.hash_method
    }

    /// Width in bits of each counter in counting filters.
    pub fn counting_bits(&self) -> u8 {
        self.counting_bits
    }

    /// Character encoding label recorded for compatibility checks.
    ///
    /// Elements are hashed as raw bytes; string helpers encode as UTF-8.
    /// The label participates in [`is_compatible`](Self::is_compatible)
    /// so filters built under differing conventions never merge.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Whether two configurations address the same bit space: identical
    /// size, hash count, hash family, and charset.
    pub fn is_compatible(&self, other: &FilterConfig) -> bool {
        self.size == other.size
            && self.hashes == other.hashes
            && self.hash_method == other.hash_method
            && self.charset == other.charset
    }

    // ========================================================================
    // Optimality relations
    // ========================================================================

    /// Optimal bit count `m* = ceil(-n * ln p / (ln 2)^2)`.
    pub fn optimal_size(expected_elements: u64, p: f64) -> u64 {
        (-(expected_elements as f64) * p.ln() / (LN_2 * LN_2)).ceil() as u64
    }

    /// Optimal hash count `k* = max(1, round((m/n) * ln 2))`.
    pub fn optimal_hashes(expected_elements: u64, size: u64) -> u32 {
        let k = (size as f64 / expected_elements as f64 * LN_2).round() as u32;
        k.max(1)
    }

    /// Achievable false-positive probability `(1 - e^(-k*n/m))^k`.
    pub fn achievable_fpp(expected_elements: u64, size: u64, hashes: u32) -> f64 {
        let exponent = -(hashes as f64) * expected_elements as f64 / size as f64;
        (1.0 - exponent.exp()).powi(hashes as i32)
    }

    /// Largest `n` for which `(m, k)` achieves `p`, from solving
    /// `p(m,n,k) = p` for `n` and taking the ceiling.
    pub fn elements_for(size: u64, hashes: u32, p: f64) -> u64 {
        let m = size as f64;
        let k = hashes as f64;
        (-(m / k) * (1.0 - p.powf(1.0 / k)).ln()).ceil() as u64
    }
}

/// Builder holding a partial configuration until [`build`] completes it.
///
/// [`build`]: FilterConfigBuilder::build
#[derive(Debug, Clone, Default)]
pub struct FilterConfigBuilder {
    expected_elements: Option<u64>,
    size: Option<u64>,
    hashes: Option<u32>,
    false_positive_probability: Option<f64>,
    hash_method: Option<HashMethod>,
    counting_bits: Option<u8>,
    charset: Option<String>,
}

impl FilterConfigBuilder {
    /// Sets the expected number of distinct elements `n`.
    pub fn expected_elements(mut self, n: u64) -> Self {
        self.expected_elements = Some(n);
        self
    }

    /// Sets the bit array length `m`.
    pub fn size(mut self, m: u64) -> Self {
        self.size = Some(m);
        self
    }

    /// Sets the number of hash functions `k`.
    pub fn hashes(mut self, k: u32) -> Self {
        self.hashes = Some(k);
        self
    }

    /// Sets the target false-positive probability `p`.
    pub fn false_positive_probability(mut self, p: f64) -> Self {
        self.false_positive_probability = Some(p);
        self
    }

    /// Sets the hash family (default MD5).
    pub fn hash_method(mut self, method: HashMethod) -> Self {
        self.hash_method = Some(method);
        self
    }

    /// Sets the counter width for counting filters (default 16).
    pub fn counting_bits(mut self, bits: u8) -> Self {
        self.counting_bits = Some(bits);
        self
    }

    /// Sets the character encoding label (default UTF-8).
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Completes the partial tuple.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when fewer than two of `{n, m, k, p}` are
    /// supplied, the supplied subset is underdetermined, any supplied
    /// value is non-positive, `p` lies outside `(0, 1)`, or the counter
    /// width is not one of 4, 8, 16, 32, 64.
    pub fn build(self) -> Result<FilterConfig, Error> {
        if let Some(p) = self.false_positive_probability {
            if !(0.0 < p && p < 1.0) {
                return Err(
                    Error::invalid_config("false-positive probability must lie in (0, 1)")
                        .with_context("p", p),
                );
            }
        }
        if self.expected_elements == Some(0) {
            return Err(Error::invalid_config("expected elements must be positive"));
        }
        if self.size == Some(0) {
            return Err(Error::invalid_config("size must be positive"));
        }
        if self.hashes == Some(0) {
            return Err(Error::invalid_config("hash count must be positive"));
        }

        let supplied = [
            self.expected_elements.is_some(),
            self.size.is_some(),
            self.hashes.is_some(),
            self.false_positive_probability.is_some(),
        ]
        .iter()
        .filter(|&&s| s)
        .count();
        if supplied < 2 {
            return Err(Error::invalid_config(
                "at least two of expected elements, size, hashes, and \
                 false-positive probability are required",
            ));
        }

        let (n, m, k, p) = match (
            self.expected_elements,
            self.size,
            self.hashes,
            self.false_positive_probability,
        ) {
            // n and m fix the bit space; k defaults to optimal and p is
            // whatever that space achieves.
            (Some(n), Some(m), k, _) => {
                let k = k.unwrap_or_else(|| FilterConfig::optimal_hashes(n, m));
                (n, m, k, FilterConfig::achievable_fpp(n, m, k))
            }
            // n and p size the array; k defaults to optimal.
            (Some(n), None, k, Some(p)) => {
                let m = FilterConfig::optimal_size(n, p);
                let k = k.unwrap_or_else(|| FilterConfig::optimal_hashes(n, m));
                (n, m, k, p)
            }
            // m and k bound capacity; n is solved from p (or the default
            // target when p is absent, in which case p is recomputed).
            (None, Some(m), Some(k), p) => match p {
                Some(p) => (FilterConfig::elements_for(m, k, p), m, k, p),
                None => {
                    let n = (m as f64 * LN_2 * LN_2
                        / -DEFAULT_FALSE_POSITIVE_PROBABILITY.ln())
                    .ceil() as u64;
                    (n, m, k, FilterConfig::achievable_fpp(n, m, k))
                }
            },
            _ => {
                return Err(Error::invalid_config(
                    "the supplied parameter subset is underdetermined",
                )
                .with_context("expected_elements", format!("{:?}", self.expected_elements))
                .with_context("size", format!("{:?}", self.size))
                .with_context("hashes", format!("{:?}", self.hashes)));
            }
        };

        let counting_bits = self.counting_bits.unwrap_or(DEFAULT_COUNTING_BITS);
        if !VALID_COUNTER_WIDTHS.contains(&counting_bits) {
            return Err(Error::invalid_config("invalid counter width")
                .with_context("counting_bits", counting_bits));
        }

        Ok(FilterConfig {
            expected_elements: n.max(1),
            size: m,
            hashes: k,
            false_positive_probability: p,
            hash_method: self.hash_method.unwrap_or(DEFAULT_HASH_METHOD),
            counting_bits,
            charset: self.charset.unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
        })
    }
}
