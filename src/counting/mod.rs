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

//! Counting Bloom filter: every bit position is backed by a saturating
//! counter, permitting element removal.
//!
//! # Usage
//!
//! ```rust
//! use cachesketch::config::FilterConfig;
//! use cachesketch::counting::CountingBloomFilter;
//!
//! let filter = CountingBloomFilter::new(FilterConfig::new(100, 0.01).unwrap());
//!
//! assert_eq!(filter.add_str("apple"), 1);
//! assert_eq!(filter.add_str("apple"), 2);
//! assert!(!filter.remove_str("apple"));
//! assert!(filter.contains_str("apple"));
//! assert!(filter.remove_str("apple"));
//! assert!(!filter.contains_str("apple"));
//! ```

mod sketch;

pub use self::sketch::CountingBloomFilter;
