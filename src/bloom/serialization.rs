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

//! JSON interchange for Bloom filters.
//!
//! The envelope is `{"size", "hashes", "HashMethod", "bits"}` with the
//! bit array carried as base64 of the wire-order byte packing.
//! Deserialization reconstructs a plain (non-counting) filter; counter
//! state is not part of the envelope.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::Serialize;

use crate::bloom::BloomFilter;
use crate::config::FilterConfig;
use crate::error::Error;
use crate::hash::HashMethod;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    size: u64,
    hashes: u32,
    #[serde(rename = "HashMethod")]
    hash_method: String,
    bits: String,
}

impl BloomFilter {
    /// Serializes the filter to its JSON envelope.
    pub fn to_json(&self) -> String {
        let envelope = Envelope {
            size: self.config().size(),
            hashes: self.config().hashes(),
            hash_method: self.config().hash_method().as_str().to_string(),
            bits: BASE64.encode(self.bit_vec().as_bytes()),
        };
        serde_json::to_string(&envelope).expect("envelope serialization cannot fail")
    }

    /// Reconstructs a filter from its JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns `MalformedData` when the envelope or the base64 payload
    /// does not parse, and `InvalidConfig` when the envelope names an
    /// unknown hash method or carries non-positive dimensions.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let envelope: Envelope = serde_json::from_str(json)
            .map_err(|e| Error::malformed("unparsable filter envelope").set_source(e))?;
        let hash_method: HashMethod = envelope.hash_method.parse()?;
        let config = FilterConfig::builder()
            .size(envelope.size)
            .hashes(envelope.hashes)
            .hash_method(hash_method)
            .build()?;
        let bytes = BASE64
            .decode(&envelope.bits)
            .map_err(|e| Error::malformed("unparsable bit array payload").set_source(e))?;
        BloomFilter::from_bytes(config, &bytes)
    }
}
