// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes in f64 precision.

use nalgebra::{Point3, Vector3};

use crate::axis::Axis;

/// Axis-aligned bounding box.
///
/// A freshly created [`BoundingBox::empty`] box is inverted (`min > max`) so
/// that the first [`include`](BoundingBox::include) snaps it onto that point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Point3<f64>,
    /// Maximum corner
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Create a box spanning two arbitrary corners
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Create an empty (inverted) box
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Create a zero-size box at a point
    #[inline]
    pub fn from_point(point: Point3<f64>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Create the tightest box around a set of points
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut bounds = Self::empty();
        for point in points {
            bounds.include(point);
        }
        bounds
    }

    /// Check if no point has been included yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to include a point
    #[inline]
    pub fn include(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Grow the box to include another box
    #[inline]
    pub fn include_box(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.include(&other.min);
        self.include(&other.max);
    }

    /// Move every side outwards by `margin`.
    ///
    /// A negative margin shrinks the box; each axis collapses onto its centre
    /// rather than inverting.
    pub fn expand(&mut self, margin: f64) {
        if self.is_empty() {
            return;
        }
        for axis in Axis::ALL {
            let i = axis.index();
            let lo = self.min[i] - margin;
            let hi = self.max[i] + margin;
            if lo <= hi {
                self.min[i] = lo;
                self.max[i] = hi;
            } else {
                let mid = (self.min[i] + self.max[i]) / 2.0;
                self.min[i] = mid;
                self.max[i] = mid;
            }
        }
    }

    /// Copy of the box expanded by `margin`
    pub fn expanded(mut self, margin: f64) -> Self {
        self.expand(margin);
        self
    }

    #[inline]
    pub fn min_on(&self, axis: Axis) -> f64 {
        axis.of(&self.min)
    }

    #[inline]
    pub fn max_on(&self, axis: Axis) -> f64 {
        axis.of(&self.max)
    }

    /// Extent along one axis (0 for an empty box)
    #[inline]
    pub fn size_on(&self, axis: Axis) -> f64 {
        (self.max_on(axis) - self.min_on(axis)).max(0.0)
    }

    /// Extent along every axis
    pub fn size(&self) -> Vector3<f64> {
        Vector3::new(
            self.size_on(Axis::X),
            self.size_on(Axis::Y),
            self.size_on(Axis::Z),
        )
    }

    /// Centre of the box
    pub fn centre(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Axis with the greatest extent. Ties resolve to the lower axis index.
    pub fn largest_axis(&self) -> Axis {
        let mut best = Axis::X;
        for axis in [Axis::Y, Axis::Z] {
            if self.size_on(axis) > self.size_on(best) {
                best = axis;
            }
        }
        best
    }

    /// Inclusive point containment
    #[inline]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Inclusive overlap on all three axes
    #[inline]
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        Axis::ALL.iter().all(|&axis| {
            self.min_on(axis) <= other.max_on(axis) && self.max_on(axis) >= other.min_on(axis)
        })
    }

    /// Squared distance from a point to the box (0 when inside)
    pub fn distance_squared_to(&self, point: &Point3<f64>) -> f64 {
        Axis::ALL
            .iter()
            .map(|&axis| {
                let v = axis.of(point);
                let d = if v < self.min_on(axis) {
                    self.min_on(axis) - v
                } else if v > self.max_on(axis) {
                    v - self.max_on(axis)
                } else {
                    0.0
                };
                d * d
            })
            .sum()
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_box_snaps_to_first_point() {
        let mut b = BoundingBox::empty();
        assert!(b.is_empty());

        b.include(&Point3::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, b.max);
    }

    #[test]
    fn from_points_and_size() {
        let pts = [
            Point3::new(0.0, 5.0, -1.0),
            Point3::new(10.0, 0.0, 1.0),
            Point3::new(4.0, 2.0, 0.0),
        ];
        let b = BoundingBox::from_points(&pts);

        assert_eq!(b.min, Point3::new(0.0, 0.0, -1.0));
        assert_eq!(b.max, Point3::new(10.0, 5.0, 1.0));
        assert_eq!(b.largest_axis(), Axis::X);
        assert_relative_eq!(b.size(), Vector3::new(10.0, 5.0, 2.0));
        assert_relative_eq!(b.centre(), Point3::new(5.0, 2.5, 0.0));
    }

    #[test]
    fn expand_grows_every_side() {
        let b = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
            .expanded(0.5);

        assert_eq!(b.min, Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(b.max, Point3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn negative_expand_collapses_without_inverting() {
        let b = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0))
            .expanded(-1.0);

        assert!(!b.is_empty());
        assert_eq!(b.size_on(Axis::X), 2.0);
        assert_eq!(b.size_on(Axis::Y), 0.0);
        assert_eq!(b.min_on(Axis::Y), 0.5);
    }

    #[test]
    fn overlap_is_inclusive() {
        let a = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let touching = BoundingBox::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let apart = BoundingBox::new(Point3::new(1.1, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));

        assert!(a.overlaps(&touching));
        assert!(!a.overlaps(&apart));
        assert!(a.contains(&Point3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn distance_to_box() {
        let b = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));

        assert_eq!(b.distance_squared_to(&Point3::new(0.5, 0.5, 0.5)), 0.0);
        assert_relative_eq!(b.distance_squared_to(&Point3::new(3.0, 0.5, 0.5)), 4.0);
        assert_relative_eq!(b.distance_squared_to(&Point3::new(2.0, 2.0, 0.5)), 2.0);
    }
}
