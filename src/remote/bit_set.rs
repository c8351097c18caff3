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

use redis::Commands;

use crate::error::Error;
use crate::remote::transport;

/// A bit vector stored under a single Redis key.
///
/// Redis addresses bits most-significant first within each byte, so the
/// stored value is byte-for-byte the local wire order and
/// [`to_bytes`](Self::to_bytes) needs no repacking.
#[derive(Debug, Clone)]
pub struct RedisBitSet {
    key: String,
    size: u64,
}

impl RedisBitSet {
    /// Addresses a bit vector of `size` bits under `key`.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }

    /// The Redis key holding the bits.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The number of logical bits.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads one bit.
    pub fn get(&self, con: &mut redis::Connection, index: u64) -> Result<bool, Error> {
        con.getbit(&self.key, index as usize).map_err(transport)
    }

    /// Writes one bit, returning its previous value.
    pub fn set(
        &self,
        con: &mut redis::Connection,
        index: u64,
        value: bool,
    ) -> Result<bool, Error> {
        con.setbit(&self.key, index as usize, value)
            .map_err(transport)
    }

    /// Stages one bit write on an external pipeline instead of issuing
    /// it; used inside multi-key transactions.
    pub fn stage_set(&self, pipe: &mut redis::Pipeline, index: u64, value: bool) {
        pipe.setbit(&self.key, index as usize, value).ignore();
    }

    /// Reads all `positions` inside one transaction so the result
    /// reflects a single coherent state.
    pub fn get_bulk(
        &self,
        con: &mut redis::Connection,
        positions: &[u64],
    ) -> Result<Vec<bool>, Error> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for &position in positions {
            pipe.getbit(&self.key, position as usize);
        }
        pipe.query(con).map_err(transport)
    }

    /// Writes all `positions` atomically, returning the previous value
    /// of each bit.
    pub fn set_bulk(
        &self,
        con: &mut redis::Connection,
        positions: &[u64],
        value: bool,
    ) -> Result<Vec<bool>, Error> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for &position in positions {
            pipe.setbit(&self.key, position as usize, value);
        }
        pipe.query(con).map_err(transport)
    }

    /// Counts the set bits (`BITCOUNT`).
    pub fn cardinality(&self, con: &mut redis::Connection) -> Result<u64, Error> {
        con.bitcount(&self.key).map_err(transport)
    }

    /// Snapshots the bit array, padded with zero bytes to the logical
    /// length (Redis stores only up to the highest written bit).
    pub fn to_bytes(&self, con: &mut redis::Connection) -> Result<Vec<u8>, Error> {
        let stored: Option<Vec<u8>> = con.get(&self.key).map_err(transport)?;
        let mut bytes = stored.unwrap_or_default();
        bytes.resize(self.size.div_ceil(8) as usize, 0);
        Ok(bytes)
    }

    /// Replaces the whole bit array with `bytes`.
    pub fn overwrite(&self, con: &mut redis::Connection, bytes: &[u8]) -> Result<(), Error> {
        con.set::<_, _, ()>(&self.key, bytes).map_err(transport)
    }

    /// Deletes the key.
    pub fn delete(&self, con: &mut redis::Connection) -> Result<(), Error> {
        con.del::<_, ()>(&self.key).map_err(transport)
    }
}
