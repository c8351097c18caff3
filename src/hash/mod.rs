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

//! Hash dispatch: maps an element's bytes to `k` bit positions in `[0, m)`.
//!
//! Every family is deterministic and endian-stable; multi-byte values are
//! always assembled with explicit little-endian conversions, never host
//! order.
//!
//! # Usage
//!
//! ```rust
//! use cachesketch::hash::HashMethod;
//!
//! let positions = HashMethod::Murmur3.positions(b"apple", 1024, 7);
//! assert_eq!(positions.len(), 7);
//! assert!(positions.iter().all(|&p| p < 1024));
//! ```

use sha2::Digest;
use sha2::Sha256;
use sha2::Sha384;
use sha2::Sha512;

use crate::error::Error;

/// Identifier of a pluggable hash family.
///
/// Selected through the configuration surface; see
/// [`FilterConfigBuilder::hash_method`](crate::config::FilterConfigBuilder::hash_method).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashMethod {
    /// MD5 digest, consumed 32 bits at a time.
    Md5,
    /// SHA-256 digest, consumed 32 bits at a time.
    Sha256,
    /// SHA-384 digest, consumed 32 bits at a time.
    Sha384,
    /// SHA-512 digest, consumed 32 bits at a time.
    Sha512,
    /// CRC-32 checksum per seed round.
    Crc32,
    /// Adler-32 checksum per seed round.
    Adler32,
    /// Canonical MurmurHash3 x86 32-bit, one seed per position.
    Murmur3,
    /// Kirsch-Mitzenmacher double hashing over two Murmur3 values.
    Murmur2DoubleHash,
    /// Per-element seeded 48-bit linear congruential generator.
    FixedSeed,
}

impl HashMethod {
    /// Derives `k` bit positions in `[0, m)` from `bytes`.
    ///
    /// `m` must be non-zero; the configuration layer guarantees this for
    /// every completed filter configuration.
    pub fn positions(&self, bytes: &[u8], m: u64, k: u32) -> Vec<u64> {
        debug_assert!(m > 0);
        match self {
            HashMethod::Md5 => digest_positions(bytes, m, k, |data| md5::compute(data).0.to_vec()),
            HashMethod::Sha256 => {
                digest_positions(bytes, m, k, |data| Sha256::digest(data).to_vec())
            }
            HashMethod::Sha384 => {
                digest_positions(bytes, m, k, |data| Sha384::digest(data).to_vec())
            }
            HashMethod::Sha512 => {
                digest_positions(bytes, m, k, |data| Sha512::digest(data).to_vec())
            }
            HashMethod::Crc32 => digest_positions(bytes, m, k, |data| {
                crc32fast::hash(data).to_le_bytes().to_vec()
            }),
            HashMethod::Adler32 => {
                digest_positions(bytes, m, k, |data| adler32(data).to_le_bytes().to_vec())
            }
            HashMethod::Murmur3 => (0..k)
                .map(|seed| mur3::murmurhash3_x86_32(bytes, seed) as u64 % m)
                .collect(),
            HashMethod::Murmur2DoubleHash => {
                let h1 = mur3::murmurhash3_x86_32(bytes, 0);
                let h2 = mur3::murmurhash3_x86_32(bytes, h1);
                (0..k as u64)
                    .map(|i| (h1 as u64).wrapping_add(i.wrapping_mul(h2 as u64)) % m)
                    .collect()
            }
            HashMethod::FixedSeed => {
                let mut lcg = Lcg48::seeded(fold_seed(bytes));
                (0..k).map(|_| lcg.next_u32() as u64 % m).collect()
            }
        }
    }

    /// Returns the configuration-surface name of this family.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashMethod::Md5 => "MD5",
            HashMethod::Sha256 => "SHA256",
            HashMethod::Sha384 => "SHA384",
            HashMethod::Sha512 => "SHA512",
            HashMethod::Crc32 => "CRC32",
            HashMethod::Adler32 => "Adler32",
            HashMethod::Murmur3 => "Murmur3",
            HashMethod::Murmur2DoubleHash => "Murmur2DoubleHash",
            HashMethod::FixedSeed => "FixedSeed",
        }
    }

    /// Every supported family, in configuration-surface order.
    pub const ALL: [HashMethod; 9] = [
        HashMethod::Md5,
        HashMethod::Sha256,
        HashMethod::Sha384,
        HashMethod::Sha512,
        HashMethod::Crc32,
        HashMethod::Adler32,
        HashMethod::Murmur3,
        HashMethod::Murmur2DoubleHash,
        HashMethod::FixedSeed,
    ];
}

impl std::str::FromStr for HashMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "MD5" => Ok(HashMethod::Md5),
            "SHA256" => Ok(HashMethod::Sha256),
            "SHA384" => Ok(HashMethod::Sha384),
            "SHA512" => Ok(HashMethod::Sha512),
            "CRC32" => Ok(HashMethod::Crc32),
            "Adler32" => Ok(HashMethod::Adler32),
            "Murmur3" => Ok(HashMethod::Murmur3),
            "Murmur2DoubleHash" => Ok(HashMethod::Murmur2DoubleHash),
            "FixedSeed" => Ok(HashMethod::FixedSeed),
            other => {
                Err(Error::invalid_config("unknown hash method").with_context("name", other))
            }
        }
    }
}

impl std::fmt::Display for HashMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derives positions by digesting `seed_le || bytes` for seed = 0, 1, ...
/// until `k * 4` output bytes exist, then splitting little-endian u32s.
fn digest_positions<F>(bytes: &[u8], m: u64, k: u32, digest: F) -> Vec<u64>
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    let needed = k as usize * 4;
    let mut pool = Vec::with_capacity(needed + 64);
    let mut salted = Vec::with_capacity(bytes.len() + 4);
    let mut seed: u32 = 0;
    while pool.len() < needed {
        salted.clear();
        salted.extend_from_slice(&seed.to_le_bytes());
        salted.extend_from_slice(bytes);
        pool.extend_from_slice(&digest(&salted));
        seed += 1;
    }
    (0..k as usize)
        .map(|i| {
            let word = u32::from_le_bytes([
                pool[4 * i],
                pool[4 * i + 1],
                pool[4 * i + 2],
                pool[4 * i + 3],
            ]);
            word as u64 % m
        })
        .collect()
}

// Adler-32 checksum (RFC 1950). Small enough to carry in-tree; none of
// the digest crates in our stack provide it.
const ADLER_MOD: u32 = 65521;

fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    // 5552 is the largest run before a/b can overflow u32.
    for chunk in data.chunks(5552) {
        for &byte in chunk {
            a += byte as u32;
            b += a;
        }
        a %= ADLER_MOD;
        b %= ADLER_MOD;
    }
    (b << 16) | a
}

/// Classic 48-bit linear congruential generator.
///
/// State advances as `state * 0x5DEECE66D + 11 (mod 2^48)`; each output
/// is the high 32 bits of the new state.
#[derive(Debug, Clone, Copy)]
struct Lcg48 {
    state: u64,
}

const LCG_MULTIPLIER: u64 = 0x5DEECE66D;
const LCG_INCREMENT: u64 = 0xB;
const LCG_MASK: u64 = (1 << 48) - 1;

impl Lcg48 {
    fn seeded(seed: u64) -> Self {
        Self {
            state: (seed ^ LCG_MULTIPLIER) & LCG_MASK,
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT)
            & LCG_MASK;
        (self.state >> 16) as u32
    }
}

/// Folds element bytes into an LCG seed (`h = h * 31 + byte`).
fn fold_seed(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0;
    for &byte in bytes {
        h = h.wrapping_mul(31).wrapping_add(byte as u64);
    }
    h
}
