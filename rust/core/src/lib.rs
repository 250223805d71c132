// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Nucleus Core
//!
//! Leaf primitives shared by the spatial index and the mesh/triangulation
//! crates:
//!
//! - **Position**: [`Point3<f64>`] from [nalgebra](https://docs.rs/nalgebra)
//! - **Axis**: the Cartesian axis selector used by the partition tree
//! - **BoundingBox**: per-axis min/max with expansion and overlap tests
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for [`Axis`] and [`BoundingBox`]

pub mod axis;
pub mod bounds;
pub mod error;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

pub use axis::Axis;
pub use bounds::BoundingBox;
pub use error::{Error, Result};
