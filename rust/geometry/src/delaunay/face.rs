// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle faces with a lazily cached XY circumcircle.

use std::cell::OnceCell;

use nalgebra::{Point2, Point3};

/// Circle through the XY projection of a triangle's corners.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circumcircle {
    pub centre: Point2<f64>,
    /// `NEG_INFINITY` for collinear corners, so the circle contains nothing
    pub radius_squared: f64,
}

impl Circumcircle {
    /// Circumcircle of `a`, `b`, `c` in the XY plane.
    ///
    /// Computed relative to `a` to keep precision for coordinates far from
    /// the origin.
    pub fn from_corners(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Self {
        let (bx, by) = (b.x - a.x, b.y - a.y);
        let (cx, cy) = (c.x - a.x, c.y - a.y);
        let d = 2.0 * (bx * cy - by * cx);

        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;

        if d == 0.0 || !ux.is_finite() || !uy.is_finite() {
            return Self {
                centre: Point2::new(a.x, a.y),
                radius_squared: f64::NEG_INFINITY,
            };
        }

        Self {
            centre: Point2::new(a.x + ux, a.y + uy),
            radius_squared: ux * ux + uy * uy,
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.radius_squared == f64::NEG_INFINITY
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius_squared.max(0.0).sqrt()
    }

    /// Strictly inside, comparing XY only.
    #[inline]
    pub fn contains_xy(&self, point: &Point3<f64>) -> bool {
        let dx = point.x - self.centre.x;
        let dy = point.y - self.centre.y;
        dx * dx + dy * dy < self.radius_squared
    }
}

/// Triangle of three vertex indices, counter-clockwise in XY.
///
/// The circumcircle is computed from the vertex positions on first use and
/// cached; every method taking `vertices` must be given the same positions.
#[derive(Debug, Clone)]
pub struct TriangleFace {
    pub vertices: [usize; 3],
    circle: OnceCell<Circumcircle>,
    excluded: bool,
}

impl TriangleFace {
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self {
            vertices: [a, b, c],
            circle: OnceCell::new(),
            excluded: false,
        }
    }

    #[inline]
    fn corners<'a>(&self, vertices: &'a [Point3<f64>]) -> [&'a Point3<f64>; 3] {
        let [a, b, c] = self.vertices;
        [&vertices[a], &vertices[b], &vertices[c]]
    }

    pub fn circumcircle(&self, vertices: &[Point3<f64>]) -> &Circumcircle {
        self.circle.get_or_init(|| {
            let [a, b, c] = self.corners(vertices);
            Circumcircle::from_corners(a, b, c)
        })
    }

    /// Whether `point` lies strictly inside the XY circumcircle.
    #[inline]
    pub fn xy_circumcircle_contains(&self, vertices: &[Point3<f64>], point: &Point3<f64>) -> bool {
        self.circumcircle(vertices).contains_xy(point)
    }

    /// Containment test that also marks the face excluded once `point` lies
    /// further right of the circle than its radius.
    ///
    /// Only valid while points arrive in ascending X order: an excluded face
    /// reports `false` for every later point without testing it.
    pub fn xy_circumcircle_contains_quick_check(
        &mut self,
        vertices: &[Point3<f64>],
        point: &Point3<f64>,
    ) -> bool {
        if self.excluded {
            return false;
        }
        let circle = *self.circumcircle(vertices);
        let dx = point.x - circle.centre.x;
        if dx > 0.0 && dx * dx > circle.radius_squared {
            self.excluded = true;
            return false;
        }
        circle.contains_xy(point)
    }

    /// Set once a quick check has ruled out every later point.
    #[inline]
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Signed XY area, positive when counter-clockwise.
    pub fn area_xy(&self, vertices: &[Point3<f64>]) -> f64 {
        let [a, b, c] = self.corners(vertices);
        0.5 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x))
    }

    #[inline]
    pub fn has_vertex(&self, index: usize) -> bool {
        self.vertices.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn right_triangle() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 5.0),
            Point3::new(0.0, 2.0, -1.0),
        ]
    }

    #[test]
    fn circumcircle_of_right_triangle() {
        let vertices = right_triangle();
        let face = TriangleFace::new(0, 1, 2);
        let circle = face.circumcircle(&vertices);

        // Hypotenuse is a diameter
        assert_relative_eq!(circle.centre, Point2::new(1.0, 1.0));
        assert_relative_eq!(circle.radius_squared, 2.0);
        assert_relative_eq!(face.area_xy(&vertices), 2.0);
    }

    #[test]
    fn far_from_origin_keeps_precision() {
        let offset = 1.0e7;
        let vertices: Vec<_> = right_triangle()
            .into_iter()
            .map(|p| Point3::new(p.x + offset, p.y + offset, p.z))
            .collect();
        let circle = *TriangleFace::new(0, 1, 2).circumcircle(&vertices);

        assert_relative_eq!(circle.centre, Point2::new(offset + 1.0, offset + 1.0));
        assert_relative_eq!(circle.radius_squared, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn containment_is_strict_and_ignores_z() {
        let vertices = right_triangle();
        let face = TriangleFace::new(0, 1, 2);

        assert!(face.xy_circumcircle_contains(&vertices, &Point3::new(1.0, 1.0, 100.0)));
        // Corners lie on the circle
        assert!(!face.xy_circumcircle_contains(&vertices, &Point3::new(2.0, 2.0, 0.0)));
        assert!(!face.xy_circumcircle_contains(&vertices, &Point3::new(3.0, 1.0, 0.0)));
    }

    #[test]
    fn collinear_corners_contain_nothing() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
        ];
        let face = TriangleFace::new(0, 1, 2);

        assert!(face.circumcircle(&vertices).is_degenerate());
        assert!(!face.xy_circumcircle_contains(&vertices, &Point3::new(1.0, 1.0, 0.0)));
        assert_eq!(face.area_xy(&vertices), 0.0);
    }

    #[test]
    fn quick_check_excludes_once_passed() {
        let vertices = right_triangle();
        let mut face = TriangleFace::new(0, 1, 2);

        assert!(face.xy_circumcircle_contains_quick_check(&vertices, &Point3::new(1.5, 1.0, 0.0)));
        assert!(!face.is_excluded());

        // Left of the circle: not inside, but later points may still be
        assert!(!face.xy_circumcircle_contains_quick_check(&vertices, &Point3::new(-5.0, 1.0, 0.0)));
        assert!(!face.is_excluded());

        assert!(!face.xy_circumcircle_contains_quick_check(&vertices, &Point3::new(2.5, 1.0, 0.0)));
        assert!(face.is_excluded());

        // Excluded faces no longer test anything
        assert!(!face.xy_circumcircle_contains_quick_check(&vertices, &Point3::new(1.0, 1.0, 0.0)));
        assert!(face.xy_circumcircle_contains(&vertices, &Point3::new(1.0, 1.0, 0.0)));
    }
}
