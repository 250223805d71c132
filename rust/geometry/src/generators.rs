// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bulk mesh generators
//!
//! Everything here writes through [`MeshBuilder::add_vertex`] and
//! [`MeshBuilder::add_face`] only, so any builder works. Inputs are checked
//! before the first vertex is added: a generator that returns an error has
//! left the builder untouched.

use nalgebra::{Point3, Vector3};

use crate::builder::MeshBuilder;
use crate::error::{Error, Result};
use crate::triangulation::fill_polygon;

const AXIS_EPSILON: f64 = 1e-12;

/// Local coordinate system a 2D profile is placed in.
///
/// `x_axis` and `y_axis` are orthonormal; the profile plane faces along
/// [`Frame::normal`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub origin: Point3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
}

impl Frame {
    /// Builds a frame, normalizing `x_axis` and making `y_axis` orthogonal
    /// to it. Fails if either axis is zero or they are parallel.
    pub fn new(origin: Point3<f64>, x_axis: Vector3<f64>, y_axis: Vector3<f64>) -> Result<Self> {
        let x_axis = x_axis.try_normalize(AXIS_EPSILON).ok_or_else(|| {
            Error::InvalidParameters("frame x axis has zero length".to_string())
        })?;
        let y_axis = (y_axis - x_axis * x_axis.dot(&y_axis))
            .try_normalize(AXIS_EPSILON)
            .ok_or_else(|| {
                Error::InvalidParameters("frame y axis is zero or parallel to x axis".to_string())
            })?;
        Ok(Self {
            origin,
            x_axis,
            y_axis,
        })
    }

    pub fn world_xy() -> Self {
        Self {
            origin: Point3::origin(),
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
        }
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.x_axis.cross(&self.y_axis)
    }

    /// Maps the XY of a profile point into this frame. Z is ignored.
    #[inline]
    pub fn to_global(&self, point: &Point3<f64>) -> Point3<f64> {
        self.origin + self.x_axis * point.x + self.y_axis * point.y
    }

    /// One frame per path point, each facing along the local path tangent.
    ///
    /// Interior tangents bisect the neighbouring segments. The first frame's
    /// x axis is perpendicular to the tangent and a world axis; later frames
    /// carry the previous x axis forward, projected onto their own plane, so
    /// the profile does not twist around straight runs. Fails on non-finite
    /// points, consecutive repeated points or a path that doubles back.
    pub fn along_path(path: &[Point3<f64>]) -> Result<Vec<Frame>> {
        if path.len() < 2 {
            return Err(Error::InvalidParameters(format!(
                "path needs at least 2 points, got {}",
                path.len()
            )));
        }

        if let Some(i) = path.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(Error::InvalidParameters(format!(
                "path point {} is not finite",
                i
            )));
        }

        // Unit direction of each segment; repeated points have none
        let segments = path
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                (pair[1] - pair[0]).try_normalize(AXIS_EPSILON).ok_or_else(|| {
                    Error::InvalidParameters(format!(
                        "path points {} and {} coincide",
                        i,
                        i + 1
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let last = path.len() - 1;
        let mut frames = Vec::with_capacity(path.len());
        let mut previous_x: Option<Vector3<f64>> = None;

        for i in 0..path.len() {
            let direction = if i == 0 {
                segments[0]
            } else if i == last {
                segments[i - 1]
            } else {
                segments[i - 1] + segments[i]
            };
            let tangent = direction.try_normalize(AXIS_EPSILON).ok_or_else(|| {
                Error::InvalidParameters(format!("path has no direction at point {}", i))
            })?;

            let transported = previous_x
                .and_then(|x| (x - tangent * tangent.dot(&x)).try_normalize(AXIS_EPSILON));
            let x_axis = match transported {
                Some(x) => x,
                None => {
                    // First vector not parallel to the tangent
                    let up = if tangent.x.abs() < 0.9 {
                        Vector3::x()
                    } else {
                        Vector3::y()
                    };
                    tangent.cross(&up).normalize()
                }
            };
            let y_axis = tangent.cross(&x_axis);

            frames.push(Frame {
                origin: path[i],
                x_axis,
                y_axis,
            });
            previous_x = Some(x_axis);
        }

        Ok(frames)
    }
}

/// Joins consecutive point strips with quads.
///
/// For strips `s` and `t`, segment `j` becomes the quad
/// `(s[j], s[j+1], t[j+1], t[j])`. With `closed`, each strip also wraps
/// from its last point back to its first. All strip vertices are added, in
/// strip order. Returns the number of faces added.
pub fn loft<B, S>(builder: &mut B, strips: &[S], closed: bool) -> Result<usize>
where
    B: MeshBuilder + ?Sized,
    S: AsRef<[Point3<f64>]>,
{
    if strips.len() < 2 {
        return Err(Error::InvalidLoft(format!(
            "need at least 2 strips, got {}",
            strips.len()
        )));
    }
    let expected = strips[0].as_ref().len();
    let minimum = if closed { 3 } else { 2 };
    if expected < minimum {
        return Err(Error::InvalidLoft(format!(
            "strips need at least {} points, got {}",
            minimum, expected
        )));
    }
    if let Some((index, found)) = strips
        .iter()
        .map(|s| s.as_ref().len())
        .enumerate()
        .find(|&(_, len)| len != expected)
    {
        return Err(Error::MismatchedStrips {
            index,
            expected,
            found,
        });
    }

    let starts: Vec<usize> = strips
        .iter()
        .map(|strip| builder.add_vertices(strip.as_ref()))
        .collect();

    let segments = if closed { expected } else { expected - 1 };
    let mut faces = 0;
    for pair in starts.windows(2) {
        let (base, next) = (pair[0], pair[1]);
        for j in 0..segments {
            let jn = (j + 1) % expected;
            builder.add_face(&[base + j, base + jn, next + jn, next + j]);
            faces += 1;
        }
    }

    tracing::trace!(strips = strips.len(), points = expected, closed, faces, "Lofted strips");
    Ok(faces)
}

/// Places `profile` at every frame and lofts the copies.
///
/// A counter-clockwise profile swept along its frames' normals gives
/// outward-facing sides. `cap` fills both ends of a closed profile, the start
/// facing backwards and the end facing forwards. Returns the number of faces
/// added.
pub fn sweep<B: MeshBuilder + ?Sized>(
    builder: &mut B,
    profile: &[Point3<f64>],
    frames: &[Frame],
    closed: bool,
    cap: bool,
) -> Result<usize> {
    if cap && !closed {
        return Err(Error::InvalidParameters(
            "only closed profiles can be capped".to_string(),
        ));
    }

    let strips: Vec<Vec<Point3<f64>>> = frames
        .iter()
        .map(|frame| profile.iter().map(|p| frame.to_global(p)).collect())
        .collect();

    let mut faces = loft(builder, &strips, closed)?;

    if cap {
        let (Some(first), Some(last)) = (strips.first(), strips.last()) else {
            return Ok(faces);
        };
        let start: Vec<Point3<f64>> = first.iter().rev().copied().collect();
        faces += fill_polygon(builder, &start, &[])?;
        faces += fill_polygon(builder, last, &[])?;
    }

    Ok(faces)
}

/// Generates a cone from a base circle to the apex at `base_centre + axis`.
///
/// Adds `segments` ring vertices counter-clockwise around `axis`, then the
/// apex, then the cap centre when `cap` is set. Side faces point outwards,
/// the cap points against `axis`. Returns the number of faces added.
pub fn cone<B: MeshBuilder + ?Sized>(
    builder: &mut B,
    base_centre: Point3<f64>,
    axis: Vector3<f64>,
    radius: f64,
    segments: usize,
    cap: bool,
) -> Result<usize> {
    if segments < 3 {
        return Err(Error::InvalidParameters(format!(
            "cone needs at least 3 segments, got {}",
            segments
        )));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(Error::InvalidParameters(format!(
            "cone radius must be positive, got {}",
            radius
        )));
    }
    let direction = axis
        .try_normalize(AXIS_EPSILON)
        .ok_or_else(|| Error::InvalidParameters("cone axis has zero length".to_string()))?;

    let up = if direction.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let perp1 = direction.cross(&up).normalize();
    let perp2 = direction.cross(&perp1);

    let ring = builder.vertex_count();
    for j in 0..segments {
        let angle = std::f64::consts::TAU * j as f64 / segments as f64;
        let offset = perp1 * (radius * angle.cos()) + perp2 * (radius * angle.sin());
        builder.add_vertex(base_centre + offset);
    }
    let apex = builder.add_vertex(base_centre + axis);

    for j in 0..segments {
        let jn = (j + 1) % segments;
        builder.add_face(&[ring + j, ring + jn, apex]);
    }
    let mut faces = segments;

    if cap {
        let centre = builder.add_vertex(base_centre);
        for j in 0..segments {
            let jn = (j + 1) % segments;
            builder.add_face(&[centre, ring + jn, ring + j]);
        }
        faces += segments;
    }

    Ok(faces)
}
