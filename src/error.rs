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

//! Error type shared by every filter operation.
//!
//! Errors render on one line as `Kind: message (key = value, ...)`,
//! with the underlying cause appended when one exists. The alternate
//! `Debug` form additionally walks the whole cause chain, one cause
//! per line.

use std::fmt;

/// Classifies every failure a filter operation can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The filter configuration is contradictory or insufficient.
    InvalidConfig,
    /// Two filters with differing size, hash count, hash method, or
    /// charset were combined.
    IncompatibleFilters,
    /// The remote store could not be reached or a transport error
    /// occurred mid-operation.
    RemoteUnavailable,
    /// The operation is not supported by this backend.
    Unsupported,
    /// Serialized filter data is malformed.
    MalformedData,
}

impl ErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::IncompatibleFilters => "IncompatibleFilters",
            ErrorKind::RemoteUnavailable => "RemoteUnavailable",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::MalformedData => "MalformedData",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned by all fallible cachesketch operations.
///
/// Carries an [`ErrorKind`] for programmatic matching, a human-readable
/// message, optional `key = value` detail segments added at the point
/// of failure, and an optional underlying cause.
pub struct Error {
    kind: ErrorKind,
    message: String,
    details: Vec<String>,
    cause: Option<anyhow::Error>,
}

impl Error {
    /// Creates an error of `kind` with a fixed message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
            cause: None,
        }
    }

    /// Appends a `key = value` detail segment to the rendered message.
    pub fn with_context(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.details.push(format!("{key} = {value}"));
        self
    }

    /// Attaches the underlying cause. At most one cause is kept; later
    /// calls on an error that already has one are a bug.
    pub fn set_source(mut self, cause: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.cause.is_none(), "error already has a cause");
        self.cause = Some(cause.into());
        self
    }

    /// The failure classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The fixed message, without details or cause.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// Constructors named after the failure they report.
impl Error {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, msg)
    }

    pub(crate) fn incompatible(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::IncompatibleFilters, msg)
    }

    pub(crate) fn remote(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteUnavailable, msg)
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, msg)
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedData, msg)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if !self.details.is_empty() {
            write!(f, " ({})", self.details.join(", "))?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if !self.details.is_empty() {
            write!(f, " ({})", self.details.join(", "))?;
        }
        if let Some(cause) = &self.cause {
            if f.alternate() {
                for entry in cause.chain() {
                    write!(f, "\ncaused by: {entry}")?;
                }
            } else {
                write!(f, ": {cause}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(AsRef::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = Error::invalid_config("fewer than two parameters supplied");
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(err.message(), "fewer than two parameters supplied");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_display_folds_details_into_one_line() {
        let err = Error::incompatible("size mismatch")
            .with_context("left", 128)
            .with_context("right", 256);
        assert_eq!(
            format!("{err}"),
            "IncompatibleFilters: size mismatch (left = 128, right = 256)"
        );
    }

    #[test]
    fn test_display_appends_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away");
        let err = Error::remote("redis operation failed").set_source(io);
        let text = format!("{err}");
        assert!(text.starts_with("RemoteUnavailable: redis operation failed"));
        assert!(text.ends_with("peer went away"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_alternate_debug_walks_the_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away");
        let err = Error::remote("redis operation failed").set_source(io);
        let text = format!("{err:#?}");
        assert!(text.contains("\ncaused by: peer went away"));
    }
}
