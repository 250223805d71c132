// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Point3, Vector3};
use nucleus_core::BoundingBox;
use smallvec::SmallVec;

use crate::builder::MeshBuilder;
use crate::triangulation::newell_normal;

/// Triangle or quad face of a [`PolyMesh`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshFace(SmallVec<[usize; 4]>);

impl MeshFace {
    #[inline]
    pub fn triangle(a: usize, b: usize, c: usize) -> Self {
        Self(SmallVec::from_slice(&[a, b, c]))
    }

    #[inline]
    pub fn quad(a: usize, b: usize, c: usize, d: usize) -> Self {
        Self(SmallVec::from_buf([a, b, c, d]))
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    #[inline]
    pub fn is_triangle(&self) -> bool {
        self.0.len() == 3
    }

    #[inline]
    pub fn is_quad(&self) -> bool {
        self.0.len() == 4
    }

    /// Splits a quad along its first diagonal; triangles yield themselves.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let i = &self.0;
        let second = self.is_quad().then(|| [i[0], i[2], i[3]]);
        std::iter::once([i[0], i[1], i[2]]).chain(second)
    }
}

/// Double-precision polygon mesh that keeps face arity
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolyMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<MeshFace>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of triangles after splitting quads
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| if f.is_quad() { 2 } else { 1 }).sum()
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    /// Unnormalized normal of a face (Newell's method), zero for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Vector3<f64> {
        let points: SmallVec<[Point3<f64>; 4]> = self.faces[face]
            .indices()
            .iter()
            .map(|&i| self.vertices[i])
            .collect();
        newell_normal(&points)
    }

    /// Total surface area, quads split along their first diagonal.
    pub fn area(&self) -> f64 {
        self.faces
            .iter()
            .flat_map(MeshFace::triangles)
            .map(|[a, b, c]| {
                let (a, b, c) = (self.vertices[a], self.vertices[b], self.vertices[c]);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    fn check_indices(&self, indices: &[usize]) {
        let count = self.vertices.len();
        assert!(
            indices.iter().all(|&i| i < count),
            "face {:?} references a vertex outside 0..{}",
            indices,
            count
        );
    }
}

impl MeshBuilder for PolyMesh {
    #[inline]
    fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    fn add_triangle(&mut self, a: usize, b: usize, c: usize) -> usize {
        self.check_indices(&[a, b, c]);
        self.faces.push(MeshFace::triangle(a, b, c));
        self.faces.len() - 1
    }

    fn add_quad(&mut self, a: usize, b: usize, c: usize, d: usize) -> usize {
        self.check_indices(&[a, b, c, d]);
        self.faces.push(MeshFace::quad(a, b, c, d));
        self.faces.len() - 1
    }

    #[inline]
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Triangle mesh
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
    /// Faces added through the builder; a quad counts once
    face_count: usize,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
            face_count: 0,
        }
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex_with_normal(&mut self, position: Point3<f64>, normal: Vector3<f64>) -> usize {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);

        self.vertex_count() - 1
    }

    #[inline]
    fn push_triangle(&mut self, a: usize, b: usize, c: usize) {
        let count = self.vertex_count();
        assert!(
            a < count && b < count && c < count,
            "triangle ({}, {}, {}) references a vertex outside 0..{}",
            a,
            b,
            c,
            count
        );
        self.indices.extend_from_slice(&[a as u32, b as u32, c as u32]);
    }

    /// Merge another mesh into this one
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = (self.positions.len() / 3) as u32;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
        self.face_count += other.face_count;
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    fn position(&self, index: usize) -> Point3<f64> {
        let p = &self.positions[index * 3..index * 3 + 3];
        Point3::new(p[0] as f64, p[1] as f64, p[2] as f64)
    }

    /// Bounding box of all vertices; empty for an empty mesh
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::empty();
        for i in 0..self.vertex_count() {
            bounds.include(&self.position(i));
        }
        bounds
    }

    /// Recompute smooth vertex normals from triangle faces (area weighted)
    pub fn compute_normals(&mut self) {
        let vertex_count = self.vertex_count();
        if vertex_count == 0 {
            return;
        }

        let mut normals = vec![Vector3::zeros(); vertex_count];

        for triangle in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            );
            let (v0, v1, v2) = (self.position(i0), self.position(i1), self.position(i2));
            let normal = (v1 - v0).cross(&(v2 - v0));

            normals[i0] += normal;
            normals[i1] += normal;
            normals[i2] += normal;
        }

        self.normals.clear();
        self.normals.reserve(vertex_count * 3);
        for normal in normals {
            let normalized = normal.try_normalize(1e-10).unwrap_or_else(Vector3::z);
            self.normals.push(normalized.x as f32);
            self.normals.push(normalized.y as f32);
            self.normals.push(normalized.z as f32);
        }
    }

    /// Clear the mesh
    #[inline]
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.indices.clear();
        self.face_count = 0;
    }
}

impl MeshBuilder for Mesh {
    /// Adds a vertex with a zero normal; call [`Mesh::compute_normals`] once
    /// all faces are in.
    fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        self.add_vertex_with_normal(position, Vector3::zeros())
    }

    fn add_triangle(&mut self, a: usize, b: usize, c: usize) -> usize {
        self.push_triangle(a, b, c);
        self.face_count += 1;
        self.face_count - 1
    }

    fn add_quad(&mut self, a: usize, b: usize, c: usize, d: usize) -> usize {
        self.push_triangle(a, b, c);
        self.push_triangle(a, c, d);
        self.face_count += 1;
        self.face_count - 1
    }

    #[inline]
    fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    fn face_count(&self) -> usize {
        self.face_count
    }
}
