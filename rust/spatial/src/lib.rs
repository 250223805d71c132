// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Nucleus Spatial
//!
//! A DD-Tree: a multi-way (not binary) axis-aligned partition tree that, at
//! each level, splits its contents along whichever axis currently has the
//! greatest extent.
//!
//! Nodes live in an arena owned by the [`DdTree`] and refer to their branches
//! by [`NodeKey`]. Items live in a second arena and are referenced by
//! [`ItemKey`]; every node keeps the keys of all items below it, so the root's
//! list always holds the full population.
//!
//! ```
//! use nucleus_spatial::{DdTree, Point3};
//!
//! let mut tree = DdTree::new();
//! let a = tree.add(Point3::new(0.0, 0.0, 0.0));
//! let b = tree.add(Point3::new(5.0, 0.0, 0.0));
//!
//! assert_eq!(tree.close_to(&Point3::new(1.0, 0.0, 0.0), 4.0), vec![a]);
//! assert_eq!(tree.nearest_to(&Point3::new(1.0, 0.0, 0.0), f64::INFINITY, Some(a)), Some(b));
//! ```

pub mod config;
pub mod item;
pub mod keys;
pub mod query;
pub mod tree;

pub use nucleus_core::{Axis, BoundingBox, Error, Point3, Result};

pub use config::TreeConfig;
pub use item::SpatialItem;
pub use keys::{ItemKey, NodeKey};
pub use tree::{DdTree, TreeNode};
