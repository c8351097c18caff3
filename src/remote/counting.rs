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

use crate::config::FilterConfig;
use crate::error::Error;
use crate::remote::DatasetKeys;
use crate::remote::RedisBitSet;
use crate::remote::RedisPool;
use crate::remote::RemoteConfig;
use crate::remote::counter_field;
use crate::remote::ensure_dataset;
use crate::remote::optimistic;
use crate::remote::transport;

/// A counting Bloom filter whose bit array and counters live in Redis.
///
/// Adds run inside one optimistic transaction over both keys. Removes
/// run in two phases: counters are decremented in a plain pipeline so
/// no decrement is ever lost, then bits are cleared in a watched
/// transaction against freshly read counter state, retrying for as
/// long as concurrent writers interfere.
///
/// Counter values are signed on this backend: removing an element that
/// was never added leaves negative counters behind until the clearing
/// phase deletes them.
#[derive(Debug)]
pub struct RedisCountingBloomFilter {
    config: FilterConfig,
    pool: RedisPool,
    keys: DatasetKeys,
    bit_set: RedisBitSet,
    expire_at: Option<u64>,
}

impl RedisCountingBloomFilter {
    /// Connects to Redis and attaches to (or initializes) the dataset
    /// named `name`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteUnavailable` when the store cannot be reached and
    /// `IncompatibleFilters` when a dataset of this name exists with a
    /// different configuration and overwriting was not requested.
    pub fn open(config: FilterConfig, remote: &RemoteConfig, name: &str) -> Result<Self, Error> {
        let pool = RedisPool::connect(remote)?;
        let keys = DatasetKeys::new(name);
        let mut con = pool.master()?;
        ensure_dataset(&mut con, &keys, &config, remote.overwrite())?;
        drop(con);
        let bit_set = RedisBitSet::new(keys.bits.clone(), config.size());
        Ok(Self {
            config,
            pool,
            keys,
            bit_set,
            expire_at: remote.expiry(),
        })
    }

    /// Inserts raw element bytes: sets the k bits and increments the k
    /// counters inside one transaction.
    ///
    /// Returns the minimum post-increment counter, the element's
    /// multiplicity estimate.
    pub fn add(&self, element: &[u8]) -> Result<i64, Error> {
        let positions = self.positions(element);
        let mut con = self.pool.master()?;
        let counts: Vec<i64> = optimistic(
            &mut con,
            &[self.keys.bits.as_str(), self.keys.counts.as_str()],
            |con, pipe| {
                for &position in &positions {
                    self.bit_set.stage_set(pipe, position, true);
                }
                for &position in &positions {
                    pipe.hincr(&self.keys.counts, &counter_field(position)[..], 1);
                }
                if let Some(epoch_seconds) = self.expire_at {
                    pipe.cmd("EXPIREAT")
                        .arg(&self.keys.counts)
                        .arg(epoch_seconds)
                        .ignore();
                }
                pipe.query(con)
            },
        )?;
        Ok(counts.into_iter().min().unwrap_or(0))
    }

    /// Inserts a string element (encoded as UTF-8 bytes).
    pub fn add_str(&self, element: &str) -> Result<i64, Error> {
        self.add(element.as_bytes())
    }

    /// Removes one occurrence of raw element bytes.
    ///
    /// Returns `true` iff this was the last occurrence, i.e. the
    /// minimum post-decrement counter is at most zero.
    pub fn remove(&self, element: &[u8]) -> Result<bool, Error> {
        Ok(self.remove_and_estimate_count(element)? <= 0)
    }

    /// Removes one occurrence of a string element.
    pub fn remove_str(&self, element: &str) -> Result<bool, Error> {
        self.remove(element.as_bytes())
    }

    /// Removes one occurrence and returns the minimum post-decrement
    /// counter across the k positions.
    pub fn remove_and_estimate_count(&self, element: &[u8]) -> Result<i64, Error> {
        let positions = self.positions(element);
        let fields: Vec<[u8; 4]> = positions.iter().map(|&p| counter_field(p)).collect();
        let mut con = self.pool.master()?;

        // Phase 1: decrement outside any transaction so concurrent
        // writers can never undo or miss a decrement.
        let mut pipe = redis::pipe();
        for field in &fields {
            pipe.hincr(&self.keys.counts, &field[..], -1);
        }
        let decremented: Vec<i64> = pipe.query(&mut *con).map_err(transport)?;

        // Phase 2: clear bits for every position whose counter dropped
        // to zero, validated against counter state read under WATCH.
        optimistic::<(), _>(
            &mut con,
            &[self.keys.bits.as_str(), self.keys.counts.as_str()],
            |con, pipe| {
                let mut read = redis::cmd("HMGET");
                read.arg(&self.keys.counts);
                for field in &fields {
                    read.arg(&field[..]);
                }
                let current: Vec<Option<i64>> = read.query(con)?;
                for ((&position, field), &count) in
                    positions.iter().zip(&fields).zip(&current)
                {
                    if count.unwrap_or(0) <= 0 {
                        self.bit_set.stage_set(pipe, position, false);
                        pipe.hdel(&self.keys.counts, &field[..]).ignore();
                    }
                }
                pipe.query(con)
            },
        )?;

        Ok(decremented.into_iter().min().unwrap_or(0))
    }

    /// Returns the minimum counter across the element's k positions.
    pub fn estimated_count(&self, element: &[u8]) -> Result<i64, Error> {
        let positions = self.positions(element);
        let mut con = self.pool.reader()?;
        let mut read = redis::cmd("HMGET");
        read.arg(&self.keys.counts);
        for position in &positions {
            read.arg(&counter_field(*position)[..]);
        }
        let counts: Vec<Option<i64>> = read.query(&mut *con).map_err(transport)?;
        Ok(counts.into_iter().map(|c| c.unwrap_or(0)).min().unwrap_or(0))
    }

    /// String form of [`estimated_count`](Self::estimated_count).
    pub fn estimated_count_str(&self, element: &str) -> Result<i64, Error> {
        self.estimated_count(element.as_bytes())
    }

    /// Tests whether raw element bytes are possibly in the set.
    pub fn contains(&self, element: &[u8]) -> Result<bool, Error> {
        let positions = self.positions(element);
        let mut con = self.pool.reader()?;
        let bits = self.bit_set.get_bulk(&mut con, &positions)?;
        Ok(bits.iter().all(|&bit| bit))
    }

    /// Tests whether a string element is possibly in the set.
    pub fn contains_str(&self, element: &str) -> Result<bool, Error> {
        self.contains(element.as_bytes())
    }

    /// Returns the number of set bits.
    pub fn population(&self) -> Result<u64, Error> {
        let mut con = self.pool.reader()?;
        self.bit_set.cardinality(&mut con)
    }

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.population()? == 0)
    }

    /// Union is not supported on this backend.
    pub fn union(&self, _other: &RedisCountingBloomFilter) -> Result<(), Error> {
        Err(Error::unsupported(
            "union is not supported on the Redis-backed counting filter",
        ))
    }

    /// Intersection is not supported on this backend.
    pub fn intersect(&self, _other: &RedisCountingBloomFilter) -> Result<(), Error> {
        Err(Error::unsupported(
            "intersection is not supported on the Redis-backed counting filter",
        ))
    }

    /// Snapshots the bit array in wire order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut con = self.pool.reader()?;
        self.bit_set.to_bytes(&mut con)
    }

    /// Deletes every key of the dataset.
    pub fn destroy(&self) -> Result<(), Error> {
        let mut con = self.pool.master()?;
        crate::remote::delete_dataset(&mut con, &self.keys)
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
