// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for primitive conversions and configuration checks.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the primitive layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An axis index outside `0..3` was supplied.
    #[error("invalid axis index: {0} (expected 0, 1 or 2)")]
    InvalidAxis(usize),

    /// A configuration value is out of its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
