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

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tracing::warn;

use crate::error::Error;

/// Connections kept per pool when none is configured.
pub const DEFAULT_CONNECTIONS: u32 = 10;

/// Connection settings for the Redis-backed filter variants.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    host: String,
    port: u16,
    connections: u32,
    read_slaves: Vec<(String, u16)>,
    expire_at: Option<u64>,
    overwrite_if_exists: bool,
}

impl RemoteConfig {
    /// Creates a configuration for a master at `host:port` with default
    /// pool size and no read replicas.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connections: DEFAULT_CONNECTIONS,
            read_slaves: Vec::new(),
            expire_at: None,
            overwrite_if_exists: false,
        }
    }

    /// Sets the maximum number of pooled connections.
    pub fn connections(mut self, connections: u32) -> Self {
        self.connections = connections;
        self
    }

    /// Adds a read replica; read-only operations may be routed to a
    /// randomly selected replica.
    pub fn read_slave(mut self, host: impl Into<String>, port: u16) -> Self {
        self.read_slaves.push((host.into(), port));
        self
    }

    /// Sets an absolute expiry (epoch seconds) re-asserted on the
    /// dataset's counter key by every add.
    pub fn expire_at(mut self, epoch_seconds: u64) -> Self {
        self.expire_at = Some(epoch_seconds);
        self
    }

    /// Wipes any existing dataset of the same name on construction.
    pub fn overwrite_if_exists(mut self, overwrite: bool) -> Self {
        self.overwrite_if_exists = overwrite;
        self
    }

    pub(crate) fn expiry(&self) -> Option<u64> {
        self.expire_at
    }

    pub(crate) fn overwrite(&self) -> bool {
        self.overwrite_if_exists
    }
}

/// Lock-free pseudo-random replica selector.
///
/// Each pick advances an atomic Weyl counter and scrambles it with the
/// splitmix64 finalizer, spreading read traffic across replicas without
/// coordinating callers.
#[derive(Debug)]
struct ReplicaPicker {
    state: AtomicU64,
}

impl ReplicaPicker {
    fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self {
            state: AtomicU64::new(nanos ^ u64::from(std::process::id())),
        }
    }

    fn pick(&self, replicas: usize) -> usize {
        let counter = self.state.fetch_add(0x9E37_79B9_7F4A_7C15, Ordering::Relaxed);
        let mut z = counter;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z % replicas as u64) as usize
    }
}

/// Pooled connections to the master and any read replicas.
///
/// A connection that raised a transport error is destroyed rather than
/// returned for reuse; the pool layer handles that distinction.
#[derive(Debug)]
pub struct RedisPool {
    master: r2d2::Pool<redis::Client>,
    replicas: Vec<r2d2::Pool<redis::Client>>,
    picker: ReplicaPicker,
}

/// A connection checked out of the pool.
pub type PooledConnection = r2d2::PooledConnection<redis::Client>;

impl RedisPool {
    /// Builds pools for the master and every configured replica.
    pub fn connect(config: &RemoteConfig) -> Result<Self, Error> {
        let master = build_pool(&config.host, config.port, config.connections)?;
        let replicas = config
            .read_slaves
            .iter()
            .map(|(host, port)| build_pool(host, *port, config.connections))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self {
            master,
            replicas,
            picker: ReplicaPicker::new(),
        })
    }

    /// Checks out a connection to the master.
    pub fn master(&self) -> Result<PooledConnection, Error> {
        self.master.get().map_err(pool_error)
    }

    /// Checks out a connection for a read-only operation, preferring a
    /// randomly selected read replica when any is configured.
    pub fn reader(&self) -> Result<PooledConnection, Error> {
        if self.replicas.is_empty() {
            return self.master();
        }
        let index = self.picker.pick(self.replicas.len());
        match self.replicas[index].get() {
            Ok(connection) => Ok(connection),
            Err(err) => {
                warn!(replica = index, error = %err, "read replica unavailable, using master");
                self.master()
            }
        }
    }
}

fn build_pool(host: &str, port: u16, connections: u32) -> Result<r2d2::Pool<redis::Client>, Error> {
    let client = redis::Client::open(format!("redis://{host}:{port}/")).map_err(|err| {
        Error::remote("invalid redis endpoint")
            .with_context("host", host)
            .with_context("port", port)
            .set_source(err)
    })?;
    r2d2::Pool::builder()
        .max_size(connections)
        .build(client)
        .map_err(pool_error)
}

fn pool_error(err: r2d2::Error) -> Error {
    Error::remote("connection pool unavailable").set_source(err)
}
