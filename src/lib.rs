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

//! A family of Bloom filters with a cache-coherence extension.
//!
//! The crate provides probabilistic set membership with a tunable
//! false-positive rate, in four layers:
//!
//! - [`bloom`]: plain Bloom filters (add, membership test, union,
//!   intersection, JSON interchange)
//! - [`counting`]: counting Bloom filters backed by saturating
//!   counters, permitting removal
//! - [`expiring`]: an expiring filter (cache sketch) that records
//!   writes to still-cached items and withdraws them when their TTL
//!   elapses
//! - [`remote`]: Redis-backed variants of the plain and counting
//!   filters, safe for concurrent writers through optimistic
//!   transactions
//!
//! Filter dimensions are derived in [`config`] from any sufficient
//! subset of expected elements `n`, bit count `m`, hash count `k`, and
//! false-positive probability `p`; [`hash`] maps element bytes to bit
//! positions through a pluggable family of hash functions.
//!
//! # Usage
//!
//! ```rust
//! use cachesketch::BloomFilter;
//! use cachesketch::FilterConfig;
//!
//! let mut filter = BloomFilter::new(FilterConfig::new(10_000, 0.01).unwrap());
//! filter.add_str("Käsebrot");
//! assert!(filter.contains_str("Käsebrot"));
//! ```

pub mod bits;
pub mod bloom;
pub mod config;
pub mod counters;
pub mod counting;
pub mod error;
pub mod expiring;
pub mod hash;
pub mod remote;

pub use crate::bloom::BloomFilter;
pub use crate::config::FilterConfig;
pub use crate::counting::CountingBloomFilter;
pub use crate::error::Error;
pub use crate::error::ErrorKind;
pub use crate::expiring::ExpiringBloomFilter;
pub use crate::hash::HashMethod;
