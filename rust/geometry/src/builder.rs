// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The mesh sink contract.

use nalgebra::Point3;

/// Sink that generators and the triangulation engine write into.
///
/// Vertex and face indices are sequential from 0 for a fresh builder. Faces
/// reference vertices already added and wind counter-clockwise when seen
/// from the side they face.
pub trait MeshBuilder {
    /// Appends a vertex, returning its index.
    fn add_vertex(&mut self, position: Point3<f64>) -> usize;

    /// Appends a triangle, returning its face index.
    fn add_triangle(&mut self, a: usize, b: usize, c: usize) -> usize;

    /// Appends a quad, returning its face index.
    fn add_quad(&mut self, a: usize, b: usize, c: usize, d: usize) -> usize;

    fn vertex_count(&self) -> usize;

    fn face_count(&self) -> usize;

    /// Appends a face from an index list.
    ///
    /// | length      | result                          |
    /// |-------------|---------------------------------|
    /// | 0, 1, 2     | `None`, nothing added           |
    /// | 3           | triangle                        |
    /// | 6           | triangle from the first three   |
    /// | 4, 5, 7+    | quad from the first four        |
    ///
    /// Length 6 is a long-standing quirk that callers depend on, so it is
    /// kept rather than treated as a quad.
    fn add_face(&mut self, indices: &[usize]) -> Option<usize> {
        match *indices {
            [a, b, c] | [a, b, c, _, _, _] => Some(self.add_triangle(a, b, c)),
            [a, b, c, d, ..] => Some(self.add_quad(a, b, c, d)),
            _ => None,
        }
    }

    /// Appends vertices in order, returning the index of the first one.
    fn add_vertices(&mut self, positions: &[Point3<f64>]) -> usize {
        let first = self.vertex_count();
        for &position in positions {
            self.add_vertex(position);
        }
        first
    }
}
