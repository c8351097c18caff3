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
use crate::remote::ensure_dataset;

/// A non-counting Bloom filter whose bit array lives in Redis.
///
/// Adds write all k bits in one atomic pipeline; membership tests read
/// all k bits inside one transaction so they observe a single coherent
/// state. Union and intersection are not offered on this backend.
#[derive(Debug)]
pub struct RedisBloomFilter {
    config: FilterConfig,
    pool: RedisPool,
    keys: DatasetKeys,
    bit_set: RedisBitSet,
}

impl RedisBloomFilter {
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
        })
    }

    /// Inserts raw element bytes.
    ///
    /// Returns `true` when the filter changed, i.e. at least one of the
    /// element's bits was previously clear.
    pub fn add(&self, element: &[u8]) -> Result<bool, Error> {
        let positions = self.positions(element);
        let mut con = self.pool.master()?;
        let previous = self.bit_set.set_bulk(&mut con, &positions, true)?;
        Ok(previous.iter().any(|&bit| !bit))
    }

    /// Inserts a string element (encoded as UTF-8 bytes).
    pub fn add_str(&self, element: &str) -> Result<bool, Error> {
        self.add(element.as_bytes())
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

    /// Clears the bit array, keeping the dataset attached.
    pub fn clear(&self) -> Result<(), Error> {
        let mut con = self.pool.master()?;
        self.bit_set.delete(&mut con)
    }

    /// Snapshots the bit array in wire order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut con = self.pool.reader()?;
        self.bit_set.to_bytes(&mut con)
    }

    /// Replaces the bit array with a serialized snapshot.
    pub fn overwrite(&self, bytes: &[u8]) -> Result<(), Error> {
        let mut con = self.pool.master()?;
        self.bit_set.overwrite(&mut con, bytes)
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
