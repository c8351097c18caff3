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

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;

use crate::config::FilterConfig;
use crate::counting::CountingBloomFilter;
use crate::expiring::delay_queue::DelayQueue;

/// An expiring Bloom filter (cache sketch).
///
/// Tracks which elements have been read into a downstream cache with a
/// TTL, and records write invalidations into the wrapped counting
/// filter only while at least one cached copy may still be live. A
/// dedicated worker thread decrements the counting filter once per
/// reported write when the write-time freshness horizon elapses.
///
/// Later TTL extensions through [`report_read`](Self::report_read) do
/// not move already-enqueued decrements: each carries a snapshot of the
/// expiry at write time, which is the correct invalidation window.
#[derive(Debug)]
pub struct ExpiringBloomFilter {
    filter: Arc<CountingBloomFilter>,
    expirations: Arc<Mutex<HashMap<Vec<u8>, Instant>>>,
    queue: Arc<DelayQueue>,
    worker: Option<JoinHandle<()>>,
}

impl ExpiringBloomFilter {
    /// Creates an expiring filter sized by `config` and starts its
    /// expiry worker thread.
    pub fn new(config: FilterConfig) -> Self {
        let filter = Arc::new(CountingBloomFilter::new(config));
        let expirations = Arc::new(Mutex::new(HashMap::new()));
        let queue = Arc::new(DelayQueue::new());

        let worker = {
            let filter = Arc::clone(&filter);
            let expirations = Arc::clone(&expirations);
            let queue = Arc::clone(&queue);
            thread::Builder::new()
                .name("cachesketch-expiry".to_string())
                .spawn(move || expiry_loop(&filter, &expirations, &queue))
                .expect("failed to spawn expiry worker")
        };

        Self {
            filter,
            expirations,
            queue,
            worker: Some(worker),
        }
    }

    /// Records that `element` was read into the cache and stays fresh
    /// for `ttl`.
    ///
    /// The expiry is monotonic: repeated reads only ever extend it
    /// (`max(existing, now + ttl)`), never shorten it.
    pub fn report_read(&self, element: &[u8], ttl: Duration) {
        let deadline = Instant::now() + ttl;
        let mut expirations = self.expirations.lock().expect("expiration lock poisoned");
        let entry = expirations.entry(element.to_vec()).or_insert(deadline);
        if deadline > *entry {
            *entry = deadline;
        }
    }

    /// String form of [`report_read`](Self::report_read).
    pub fn report_read_str(&self, element: &str, ttl: Duration) {
        self.report_read(element.as_bytes(), ttl);
    }

    /// Records a write to `element`.
    ///
    /// When a cached copy may still be live the element is added to the
    /// counting filter and exactly one expiry-triggered decrement is
    /// scheduled at the current freshness horizon. Returns whether the
    /// write was recorded.
    pub fn report_write(&self, element: &[u8]) -> bool {
        // Same lock as report_read: a write that follows a read which
        // made the element cached must observe is_cached = true.
        let expirations = self.expirations.lock().expect("expiration lock poisoned");
        match expirations.get(element) {
            Some(&expiry) if expiry > Instant::now() => {
                self.filter.add(element);
                self.queue.push(element.to_vec(), expiry);
                true
            }
            _ => false,
        }
    }

    /// String form of [`report_write`](Self::report_write).
    pub fn report_write_str(&self, element: &str) -> bool {
        self.report_write(element.as_bytes())
    }

    /// Whether a cached copy of `element` may still be live.
    pub fn is_cached(&self, element: &[u8]) -> bool {
        let expirations = self.expirations.lock().expect("expiration lock poisoned");
        expirations
            .get(element)
            .is_some_and(|&expiry| expiry > Instant::now())
    }

    /// String form of [`is_cached`](Self::is_cached).
    pub fn is_cached_str(&self, element: &str) -> bool {
        self.is_cached(element.as_bytes())
    }

    /// Whether `element` was recently written while cached, i.e. a
    /// client-side copy should not be trusted.
    pub fn contains(&self, element: &[u8]) -> bool {
        self.filter.contains(element)
    }

    /// String form of [`contains`](Self::contains).
    pub fn contains_str(&self, element: &str) -> bool {
        self.filter.contains_str(element)
    }

    /// The wrapped counting filter.
    pub fn filter(&self) -> &CountingBloomFilter {
        &self.filter
    }

    /// The configuration this filter was built with.
    pub fn config(&self) -> &FilterConfig {
        self.filter.config()
    }
}

impl Drop for ExpiringBloomFilter {
    fn drop(&mut self) {
        self.queue.shutdown();
        if let Some(worker) = self.worker.take() {
            // A worker that panicked already did its damage; nothing
            // useful to propagate out of drop.
            let _ = worker.join();
        }
    }
}

fn expiry_loop(
    filter: &CountingBloomFilter,
    expirations: &Mutex<HashMap<Vec<u8>, Instant>>,
    queue: &DelayQueue,
) {
    while let Some(element) = queue.next_expired() {
        filter.remove(&element);
        debug!(len = element.len(), "expired one write invalidation");

        // Drop the index entry unless a later read extended it.
        let mut expirations = expirations.lock().expect("expiration lock poisoned");
        if let Some(&expiry) = expirations.get(&element) {
            if expiry <= Instant::now() {
                expirations.remove(&element);
            }
        }
    }
    debug!("expiry worker shut down");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sketch() -> ExpiringBloomFilter {
        ExpiringBloomFilter::new(FilterConfig::new(100, 0.01).unwrap())
    }

    fn eventually(deadline: Duration, check: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        check()
    }

    #[test]
    fn test_write_before_read_is_not_recorded() {
        let sketch = sketch();
        assert!(!sketch.report_write_str("page"));
        assert!(!sketch.contains_str("page"));
    }

    #[test]
    fn test_write_while_cached_is_recorded() {
        let sketch = sketch();
        sketch.report_read_str("page", Duration::from_secs(10));
        assert!(sketch.is_cached_str("page"));
        assert!(sketch.report_write_str("page"));
        assert!(sketch.contains_str("page"));
    }

    #[test]
    fn test_expiry_decrements_exactly_once() {
        let sketch = sketch();
        sketch.report_read_str("page", Duration::from_millis(50));
        sketch.report_write_str("page");
        assert!(sketch.contains_str("page"));

        assert!(eventually(Duration::from_secs(2), || {
            !sketch.contains_str("page")
        }));
        assert!(sketch.filter().is_empty());
    }

    #[test]
    fn test_read_extension_does_not_move_enqueued_decrement() {
        let sketch = sketch();
        sketch.report_read_str("page", Duration::from_millis(40));
        sketch.report_write_str("page");
        // Extending the cache lifetime must not keep the earlier write
        // invalidation alive past its write-time horizon.
        sketch.report_read_str("page", Duration::from_secs(60));

        assert!(eventually(Duration::from_secs(2), || {
            !sketch.contains_str("page")
        }));
        assert!(sketch.is_cached_str("page"));
    }

    #[test]
    fn test_report_read_is_monotonic() {
        let sketch = sketch();
        sketch.report_read_str("page", Duration::from_secs(60));
        sketch.report_read_str("page", Duration::from_millis(1));
        // The shorter TTL must not shorten the recorded expiry.
        thread::sleep(Duration::from_millis(20));
        assert!(sketch.is_cached_str("page"));
    }

    #[test]
    fn test_multiple_writes_each_expire() {
        let sketch = sketch();
        sketch.report_read_str("page", Duration::from_millis(60));
        sketch.report_write_str("page");
        sketch.report_write_str("page");
        assert_eq!(sketch.filter().estimated_count_str("page"), 2);

        assert!(eventually(Duration::from_secs(2), || {
            sketch.filter().is_empty()
        }));
    }

    #[test]
    fn test_uncached_after_ttl() {
        let sketch = sketch();
        sketch.report_read_str("page", Duration::from_millis(30));
        assert!(eventually(Duration::from_secs(1), || {
            !sketch.is_cached_str("page")
        }));
    }
}
