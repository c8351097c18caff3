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

//! Redis-backed filter variants.
//!
//! A dataset named `N` occupies three keys:
//! - `N`: configuration snapshot (hash of parameter name to value),
//!   written on construction and compared on reattachment
//! - `N:bits`: the bit array as a byte string (Redis bit offsets are
//!   most-significant-bit first, matching the local wire order)
//! - `N:counts`: counters as a hash of 4-byte big-endian position to
//!   decimal count
//!
//! Multi-writer correctness relies on optimistic `WATCH`/`MULTI`/`EXEC`
//! transactions; aborted transactions retry without bound, backing off
//! under contention.
//!
//! # Usage
//!
//! ```no_run
//! use cachesketch::config::FilterConfig;
//! use cachesketch::remote::RedisCountingBloomFilter;
//! use cachesketch::remote::RemoteConfig;
//!
//! let config = FilterConfig::new(10_000, 0.01).unwrap();
//! let remote = RemoteConfig::new("localhost", 6379);
//! let filter = RedisCountingBloomFilter::open(config, &remote, "page-visits").unwrap();
//!
//! filter.add_str("user:42").unwrap();
//! assert!(filter.contains_str("user:42").unwrap());
//! ```

mod bit_set;
mod bloom;
mod counting;
mod pool;

pub use self::bit_set::RedisBitSet;
pub use self::bloom::RedisBloomFilter;
pub use self::counting::RedisCountingBloomFilter;
pub use self::pool::PooledConnection;
pub use self::pool::RedisPool;
pub use self::pool::RemoteConfig;

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use byteorder::BigEndian;
use byteorder::ByteOrder;
use redis::Commands;
use tracing::debug;

use crate::config::FilterConfig;
use crate::error::Error;

/// Key names occupied by one dataset.
#[derive(Debug, Clone)]
pub(crate) struct DatasetKeys {
    pub config: String,
    pub bits: String,
    pub counts: String,
}

impl DatasetKeys {
    pub fn new(name: &str) -> Self {
        Self {
            config: name.to_string(),
            bits: format!("{name}:bits"),
            counts: format!("{name}:counts"),
        }
    }
}

/// Encodes a bit position as its 4-byte big-endian counter field.
pub(crate) fn counter_field(position: u64) -> [u8; 4] {
    let mut field = [0u8; 4];
    BigEndian::write_u32(&mut field, position as u32);
    field
}

pub(crate) fn transport(err: redis::RedisError) -> Error {
    Error::remote("redis operation failed").set_source(err)
}

/// Runs `body` inside a WATCH/MULTI/EXEC transaction on `keys`,
/// retrying with capped-exponential backoff for as long as concurrent
/// writers abort it.
///
/// `body` may issue watched reads on the connection, must stage its
/// mutations on the pipeline, and must finish with `pipe.query(con)`;
/// a `None` result signals an aborted transaction.
pub(crate) fn optimistic<T, F>(
    con: &mut redis::Connection,
    keys: &[&str],
    mut body: F,
) -> Result<T, Error>
where
    F: FnMut(&mut redis::Connection, &mut redis::Pipeline) -> redis::RedisResult<Option<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        redis::cmd("WATCH")
            .arg(keys)
            .query::<()>(con)
            .map_err(transport)?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        match body(con, &mut pipe) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                attempt += 1;
                debug!(attempt, "transaction aborted by concurrent writer, retrying");
                thread::sleep(backoff(attempt));
            }
            Err(err) => return Err(transport(err)),
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_micros(100u64 << attempt.min(7))
}

/// Writes the parameter snapshot for a fresh dataset.
pub(crate) fn write_config_snapshot(
    con: &mut redis::Connection,
    key: &str,
    config: &FilterConfig,
) -> Result<(), Error> {
    let entries = [
        ("expectedElements", config.expected_elements().to_string()),
        ("size", config.size().to_string()),
        ("hashes", config.hashes().to_string()),
        (
            "falsePositiveProbability",
            config.false_positive_probability().to_string(),
        ),
        ("hashMethod", config.hash_method().as_str().to_string()),
        ("countingBits", config.counting_bits().to_string()),
        ("charset", config.charset().to_string()),
    ];
    con.hset_multiple::<_, _, _, ()>(key, &entries)
        .map_err(transport)
}

/// Compares an existing snapshot against `config`.
///
/// Returns `Ok(true)` when a compatible snapshot exists, `Ok(false)`
/// when the dataset is absent.
///
/// # Errors
///
/// Returns `IncompatibleFilters` when a snapshot exists but differs in
/// size, hash count, hash method, or charset.
pub(crate) fn check_config_snapshot(
    con: &mut redis::Connection,
    key: &str,
    config: &FilterConfig,
) -> Result<bool, Error> {
    let stored: HashMap<String, String> = con.hgetall(key).map_err(transport)?;
    if stored.is_empty() {
        return Ok(false);
    }
    let field = |name: &str| stored.get(name).map(String::as_str).unwrap_or("");
    let compatible = field("size") == config.size().to_string()
        && field("hashes") == config.hashes().to_string()
        && field("hashMethod") == config.hash_method().as_str()
        && field("charset") == config.charset();
    if compatible {
        Ok(true)
    } else {
        Err(
            Error::incompatible("existing dataset was built with a different configuration")
                .with_context("dataset", key)
                .with_context("stored_size", field("size").to_string())
                .with_context("requested_size", config.size()),
        )
    }
}

/// Deletes every key of the dataset.
pub(crate) fn delete_dataset(con: &mut redis::Connection, keys: &DatasetKeys) -> Result<(), Error> {
    con.del::<_, ()>(&[keys.config.as_str(), keys.bits.as_str(), keys.counts.as_str()][..])
        .map_err(transport)
}

/// Attaches to (or initializes) the dataset, honoring the overwrite
/// flag.
pub(crate) fn ensure_dataset(
    con: &mut redis::Connection,
    keys: &DatasetKeys,
    config: &FilterConfig,
    overwrite_if_exists: bool,
) -> Result<(), Error> {
    if overwrite_if_exists {
        delete_dataset(con, keys)?;
    } else if check_config_snapshot(con, &keys.config, config)? {
        return Ok(());
    }
    write_config_snapshot(con, &keys.config, config)
}
