// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nucleus Geometry
//!
//! Mesh construction decoupled from mesh representation: algorithms write
//! vertices and faces through the [`MeshBuilder`] trait, and callers pick the
//! concrete type ([`PolyMesh`], [`Mesh`], or their own).
//!
//! On top of that sit the bulk generators (loft, sweep, cone, polygon fill)
//! and an incremental Delaunay triangulation of XY vertex sets.

pub mod builder;
pub mod delaunay;
pub mod error;
pub mod generators;
pub mod mesh;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};
pub use nucleus_core::BoundingBox;

pub use builder::MeshBuilder;
pub use delaunay::{triangulate, triangulate_into, Circumcircle, DelaunayOptions, TriangleFace};
pub use error::{Error, Result};
pub use generators::{cone, loft, sweep, Frame};
pub use mesh::{Mesh, MeshFace, PolyMesh};
pub use triangulation::fill_polygon;
