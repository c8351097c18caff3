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

//! Tests against a live Redis at localhost:6379.
//!
//! Run with `cargo test -- --ignored` once a disposable Redis instance
//! is available; every test uses its own dataset name and destroys it.

use std::sync::Arc;

use cachesketch::ErrorKind;
use cachesketch::FilterConfig;
use cachesketch::remote::RedisBloomFilter;
use cachesketch::remote::RedisCountingBloomFilter;
use cachesketch::remote::RemoteConfig;

fn remote() -> RemoteConfig {
    RemoteConfig::new("localhost", 6379).overwrite_if_exists(true)
}

#[test]
#[ignore = "requires a running Redis"]
fn test_remote_bloom_round_trip() {
    let filter = RedisBloomFilter::open(
        FilterConfig::new(1000, 0.01).unwrap(),
        &remote(),
        "cachesketch-test-bloom",
    )
    .unwrap();

    assert!(filter.is_empty().unwrap());
    assert!(filter.add_str("apple").unwrap());
    assert!(!filter.add_str("apple").unwrap());
    assert!(filter.contains_str("apple").unwrap());
    assert!(!filter.contains_str("grape").unwrap());
    assert!(filter.population().unwrap() > 0);

    filter.destroy().unwrap();
}

#[test]
#[ignore = "requires a running Redis"]
fn test_remote_counting_add_remove() {
    let filter = RedisCountingBloomFilter::open(
        FilterConfig::new(100, 0.01).unwrap(),
        &remote(),
        "cachesketch-test-counting",
    )
    .unwrap();

    assert_eq!(filter.add_str("Schnitte").unwrap(), 1);
    assert_eq!(filter.add_str("Schnitte").unwrap(), 2);

    assert!(!filter.remove_str("Schnitte").unwrap());
    assert!(filter.contains_str("Schnitte").unwrap());
    assert!(filter.remove_str("Schnitte").unwrap());
    assert!(!filter.contains_str("Schnitte").unwrap());
    assert!(filter.is_empty().unwrap());

    filter.destroy().unwrap();
}

#[test]
#[ignore = "requires a running Redis"]
fn test_remote_state_matches_local_wire_order() {
    let config = FilterConfig::new(100, 0.01).unwrap();
    let remote_filter = RedisBloomFilter::open(
        config.clone(),
        &remote(),
        "cachesketch-test-wire-order",
    )
    .unwrap();
    let mut local = cachesketch::BloomFilter::new(config);

    for element in ["one", "two", "three"] {
        remote_filter.add_str(element).unwrap();
        local.add_str(element);
    }
    assert_eq!(remote_filter.to_bytes().unwrap(), local.bit_vec().as_bytes());

    remote_filter.destroy().unwrap();
}

#[test]
#[ignore = "requires a running Redis"]
fn test_reattachment_checks_compatibility() {
    let name = "cachesketch-test-reattach";
    let first = RedisCountingBloomFilter::open(
        FilterConfig::new(1000, 0.01).unwrap(),
        &remote(),
        name,
    )
    .unwrap();

    // Same configuration reattaches.
    RedisCountingBloomFilter::open(
        FilterConfig::new(1000, 0.01).unwrap(),
        &RemoteConfig::new("localhost", 6379),
        name,
    )
    .unwrap();

    // A differently sized configuration is rejected.
    let err = RedisCountingBloomFilter::open(
        FilterConfig::new(5000, 0.01).unwrap(),
        &RemoteConfig::new("localhost", 6379),
        name,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleFilters);

    first.destroy().unwrap();
}

#[test]
#[ignore = "requires a running Redis"]
fn test_remote_union_is_unsupported() {
    let open = |name: &str| {
        RedisCountingBloomFilter::open(FilterConfig::new(100, 0.01).unwrap(), &remote(), name)
            .unwrap()
    };
    let left = open("cachesketch-test-union-left");
    let right = open("cachesketch-test-union-right");

    assert_eq!(
        left.union(&right).unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        left.intersect(&right).unwrap_err().kind(),
        ErrorKind::Unsupported
    );

    left.destroy().unwrap();
    right.destroy().unwrap();
}

// Concurrent inserts must land in the same final state as a
// single-threaded replay of the same multiset of operations.
#[test]
#[ignore = "requires a running Redis"]
fn test_concurrent_adds_match_sequential_replay() {
    let config = FilterConfig::new(10_000, 0.01).unwrap();
    let concurrent = Arc::new(
        RedisCountingBloomFilter::open(
            config.clone(),
            &remote(),
            "cachesketch-test-concurrent",
        )
        .unwrap(),
    );

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let filter = Arc::clone(&concurrent);
            std::thread::spawn(move || {
                for i in 0..50 {
                    filter.add_str(&format!("element-{}", i % 10)).unwrap();
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let sequential = RedisCountingBloomFilter::open(
        config,
        &remote(),
        "cachesketch-test-sequential",
    )
    .unwrap();
    for _ in 0..8 {
        for i in 0..50 {
            sequential.add_str(&format!("element-{}", i % 10)).unwrap();
        }
    }

    assert_eq!(
        concurrent.to_bytes().unwrap(),
        sequential.to_bytes().unwrap()
    );
    for i in 0..10 {
        let element = format!("element-{i}");
        assert_eq!(
            concurrent.estimated_count_str(&element).unwrap(),
            sequential.estimated_count_str(&element).unwrap(),
            "{element}"
        );
    }

    concurrent.destroy().unwrap();
    sequential.destroy().unwrap();
}
