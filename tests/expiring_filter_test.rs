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

use std::time::Duration;
use std::time::Instant;

use cachesketch::ExpiringBloomFilter;
use cachesketch::FilterConfig;

fn sketch() -> ExpiringBloomFilter {
    ExpiringBloomFilter::new(FilterConfig::new(1000, 0.01).unwrap())
}

fn eventually(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

#[test]
fn test_write_invalidation_expires_with_the_ttl() {
    let sketch = sketch();
    sketch.report_read_str("page", Duration::from_millis(100));
    assert!(sketch.report_write_str("page"));
    assert!(sketch.contains_str("page"));

    std::thread::sleep(Duration::from_millis(150));
    assert!(eventually(Duration::from_secs(1), || {
        !sketch.contains_str("page")
    }));
}

#[test]
fn test_write_without_cached_copy_is_ignored() {
    let sketch = sketch();
    assert!(!sketch.report_write_str("never-read"));
    assert!(!sketch.contains_str("never-read"));

    sketch.report_read_str("short-lived", Duration::from_millis(20));
    std::thread::sleep(Duration::from_millis(60));
    assert!(!sketch.report_write_str("short-lived"));
    assert!(!sketch.contains_str("short-lived"));
}

#[test]
fn test_every_write_during_window_is_counted() {
    let sketch = sketch();
    sketch.report_read_str("page", Duration::from_secs(30));
    for _ in 0..3 {
        sketch.report_write_str("page");
    }
    assert_eq!(sketch.filter().estimated_count_str("page"), 3);
}

#[test]
fn test_reads_only_extend_the_window() {
    let sketch = sketch();
    sketch.report_read_str("page", Duration::from_secs(30));
    sketch.report_read_str("page", Duration::from_millis(1));
    std::thread::sleep(Duration::from_millis(30));
    // The later, shorter TTL must not have shortened the window.
    assert!(sketch.is_cached_str("page"));
}

#[test]
fn test_extension_does_not_delay_existing_invalidation() {
    let sketch = sketch();
    sketch.report_read_str("page", Duration::from_millis(60));
    sketch.report_write_str("page");
    sketch.report_read_str("page", Duration::from_secs(120));

    // The write's decrement fires at its write-time horizon even
    // though the element is still cached afterwards.
    assert!(eventually(Duration::from_secs(2), || {
        !sketch.contains_str("page")
    }));
    assert!(sketch.is_cached_str("page"));
}

#[test]
fn test_contains_eventually_false_without_further_reads() {
    let sketch = sketch();
    sketch.report_read_str("page", Duration::from_millis(80));
    sketch.report_write_str("page");
    sketch.report_write_str("page");
    sketch.report_write_str("page");

    assert!(eventually(Duration::from_secs(2), || {
        !sketch.contains_str("page")
    }));
    assert!(sketch.filter().is_empty());
}

#[test]
fn test_independent_elements_expire_independently() {
    let sketch = sketch();
    sketch.report_read_str("fast", Duration::from_millis(40));
    sketch.report_read_str("slow", Duration::from_secs(30));
    sketch.report_write_str("fast");
    sketch.report_write_str("slow");

    assert!(eventually(Duration::from_secs(2), || {
        !sketch.contains_str("fast")
    }));
    assert!(sketch.contains_str("slow"));
}

#[test]
fn test_drop_stops_the_worker() {
    let sketch = sketch();
    sketch.report_read_str("pending", Duration::from_secs(600));
    sketch.report_write_str("pending");
    // Dropping with a far-future entry enqueued must not hang.
    drop(sketch);
}
