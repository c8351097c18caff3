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

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Condvar;
use std::sync::Mutex;
use std::time::Instant;

/// A blocking queue of `(element, deadline)` pairs ordered by deadline.
///
/// The consumer blocks in [`next_expired`](Self::next_expired) until the
/// earliest deadline elapses or the queue is shut down. A min-heap under
/// a mutex with a condition variable stands in for a dedicated
/// delay-queue primitive.
#[derive(Debug)]
pub(crate) struct DelayQueue {
    inner: Mutex<Inner>,
    available: Condvar,
}

#[derive(Debug)]
struct Inner {
    heap: BinaryHeap<Reverse<Entry>>,
    shutdown: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    deadline: Instant,
    element: Vec<u8>,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.element.cmp(&other.element))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl DelayQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueues an element to be released at `deadline`.
    pub fn push(&self, element: Vec<u8>, deadline: Instant) {
        let mut inner = self.inner.lock().expect("delay queue lock poisoned");
        inner.heap.push(Reverse(Entry { deadline, element }));
        // The new entry may precede the deadline the consumer sleeps on.
        self.available.notify_one();
    }

    /// Blocks until the earliest deadline elapses and returns its
    /// element, or `None` once the queue is shut down.
    pub fn next_expired(&self) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().expect("delay queue lock poisoned");
        loop {
            if inner.shutdown {
                return None;
            }
            let wait = match inner.heap.peek() {
                None => None,
                Some(Reverse(entry)) => {
                    let now = Instant::now();
                    if entry.deadline <= now {
                        let Reverse(entry) =
                            inner.heap.pop().expect("peeked entry disappeared");
                        return Some(entry.element);
                    }
                    Some(entry.deadline - now)
                }
            };
            inner = match wait {
                None => self
                    .available
                    .wait(inner)
                    .expect("delay queue lock poisoned"),
                Some(timeout) => {
                    self.available
                        .wait_timeout(inner, timeout)
                        .expect("delay queue lock poisoned")
                        .0
                }
            };
        }
    }

    /// Wakes all consumers and makes further `next_expired` calls
    /// return `None`. Pending entries are discarded with the queue.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().expect("delay queue lock poisoned");
        inner.shutdown = true;
        self.available.notify_all();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("delay queue lock poisoned")
            .heap
            .len()
    }
}
