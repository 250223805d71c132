// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar polygon filling
//!
//! Projects a (roughly) planar 3D outline onto its own plane and fills it
//! with earcutr. Used for sweep end caps and available to callers directly.

use nalgebra::{Point2, Point3, Vector3};

use crate::builder::MeshBuilder;
use crate::error::{Error, Result};

/// Unnormalized polygon normal by Newell's method.
///
/// Zero for degenerate (collinear or empty) input. Counter-clockwise
/// outlines seen from above give +Z.
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();
    let mut normal = Vector3::<f64>::zeros();

    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal
}

/// Orthonormal (u, v) basis of the plane with the given unit normal, such
/// that `u × v == normal`.
fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // Axis least parallel to the normal keeps the cross product stable
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let reference = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u = normal.cross(&reference).normalize();
    let v = normal.cross(&u);
    (u, v)
}

fn project(points: &[Point3<f64>], origin: &Point3<f64>, u: &Vector3<f64>, v: &Vector3<f64>) -> Vec<Point2<f64>> {
    points
        .iter()
        .map(|p| {
            let d = p - origin;
            Point2::new(d.dot(u), d.dot(v))
        })
        .collect()
}

/// Triangulates a 2D polygon with holes.
///
/// Indices refer to the outer ring followed by each hole in order. Every
/// triangle is returned counter-clockwise.
pub fn triangulate_polygon(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<[usize; 3]>> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    let total = outer.len() + holes.iter().map(Vec::len).sum::<usize>();
    let mut flat = Vec::with_capacity(total * 2);
    let mut hole_starts = Vec::with_capacity(holes.len());
    let mut points = Vec::with_capacity(total);

    for p in outer {
        flat.extend_from_slice(&[p.x, p.y]);
        points.push(*p);
    }
    for hole in holes {
        hole_starts.push(points.len());
        for p in hole {
            flat.extend_from_slice(&[p.x, p.y]);
            points.push(*p);
        }
    }

    let indices = earcutr::earcut(&flat, &hole_starts, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (points[t[0]], points[t[1]], points[t[2]]);
            let cross = (b - a).perp(&(c - a));
            if cross < 0.0 {
                [t[0], t[2], t[1]]
            } else {
                [t[0], t[1], t[2]]
            }
        })
        .collect())
}

/// Fills a planar outline (with optional holes) into `builder`.
///
/// The faces point along the outline's Newell normal, so a counter-clockwise
/// outline faces the viewer. Every outline and hole vertex is added, in
/// order, even if earcut leaves some unused. Returns the number of faces
/// added; a degenerate outline adds nothing and is not an error.
pub fn fill_polygon<B: MeshBuilder + ?Sized>(
    builder: &mut B,
    outline: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
) -> Result<usize> {
    if outline.len() < 3 {
        return Ok(0);
    }
    let Some(normal) = newell_normal(outline).try_normalize(1e-12) else {
        tracing::debug!(points = outline.len(), "Skipped filling degenerate polygon");
        return Ok(0);
    };

    let (u, v) = plane_basis(&normal);
    let origin = outline[0];
    let outer_2d = project(outline, &origin, &u, &v);
    let holes_2d: Vec<_> = holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(|h| project(h, &origin, &u, &v))
        .collect();

    let triangles = triangulate_polygon(&outer_2d, &holes_2d)?;

    let first = builder.add_vertices(outline);
    for hole in holes.iter().filter(|h| h.len() >= 3) {
        builder.add_vertices(hole);
    }
    for &[a, b, c] in &triangles {
        builder.add_triangle(first + a, first + b, first + c);
    }
    Ok(triangles.len())
}
