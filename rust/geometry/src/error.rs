// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating geometry
#[derive(Error, Debug)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Invalid loft: {0}")]
    InvalidLoft(String),

    #[error("Strip {index} has {found} points, expected {expected}")]
    MismatchedStrips {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid generator parameters: {0}")]
    InvalidParameters(String),

    #[error("Core error: {0}")]
    CoreError(#[from] nucleus_core::Error),
}
