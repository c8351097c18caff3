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

//! Expiring Bloom filter (cache sketch) for cache-coherence decisions.
//!
//! Cache reads are reported with a TTL; writes to still-fresh elements
//! are recorded in a counting filter and automatically withdrawn when
//! the freshness window elapses. A client checks
//! [`contains`](ExpiringBloomFilter::contains) to decide whether its
//! cached copy can be trusted.
//!
//! # Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use cachesketch::config::FilterConfig;
//! use cachesketch::expiring::ExpiringBloomFilter;
//!
//! let sketch = ExpiringBloomFilter::new(FilterConfig::new(1000, 0.01).unwrap());
//!
//! sketch.report_read_str("user:42", Duration::from_secs(60));
//! assert!(sketch.is_cached_str("user:42"));
//!
//! sketch.report_write_str("user:42");
//! assert!(sketch.contains_str("user:42")); // cached copies are stale
//! ```

mod delay_queue;
mod sketch;

pub use self::sketch::ExpiringBloomFilter;
