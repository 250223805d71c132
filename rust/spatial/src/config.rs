// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tree configuration.

use nucleus_core::{Error, Result};

/// Subdivision settings, fixed for the lifetime of a tree.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeConfig {
    /// A leaf holding more items than this subdivides on the next insertion.
    pub max_leaf_population: usize,
    /// Upper bound on the number of branches created by one subdivision.
    pub max_divisions: usize,
    /// Cells are never made smaller than this along the split axis.
    pub min_cell_size: f64,
}

impl TreeConfig {
    pub fn with_max_leaf_population(mut self, max_leaf_population: usize) -> Self {
        self.max_leaf_population = max_leaf_population;
        self
    }

    pub fn with_max_divisions(mut self, max_divisions: usize) -> Self {
        self.max_divisions = max_divisions;
        self
    }

    pub fn with_min_cell_size(mut self, min_cell_size: f64) -> Self {
        self.min_cell_size = min_cell_size;
        self
    }

    /// Check that every setting is in range.
    pub fn validate(&self) -> Result<()> {
        if self.max_leaf_population == 0 {
            return Err(Error::InvalidConfig(
                "max_leaf_population must be at least 1".to_string(),
            ));
        }
        if self.max_divisions < 2 {
            return Err(Error::InvalidConfig(format!(
                "max_divisions must be at least 2, got {}",
                self.max_divisions
            )));
        }
        if !(self.min_cell_size.is_finite() && self.min_cell_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_cell_size must be finite and positive, got {}",
                self.min_cell_size
            )));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_leaf_population: 10,
            max_divisions: 10,
            min_cell_size: 1e-3,
        }
    }
}
