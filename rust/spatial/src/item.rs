// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The capability an item needs to be stored in a [`DdTree`](crate::DdTree).

use nalgebra::Point3;
use nucleus_core::{Axis, BoundingBox};

/// A positioned item, optionally with axis-aligned extents.
///
/// Items are routed into branches by [`coordinate`](SpatialItem::coordinate);
/// subdivision measures their [`extent`](SpatialItem::extent).
///
/// `distance_squared_to` must never be smaller than the squared separation
/// between the query point and the item's extent along any single axis.
/// Both the default (distance to the position) and the [`BoundingBox`]
/// implementation (distance to the box) satisfy this, and the tree relies
/// on it when pruning branches.
pub trait SpatialItem {
    /// Position used to route the item into a branch.
    fn position(&self) -> Point3<f64>;

    #[inline]
    fn coordinate(&self, axis: Axis) -> f64 {
        axis.of(&self.position())
    }

    /// Minimum and maximum along `axis`. Point-like items collapse onto
    /// their coordinate.
    #[inline]
    fn extent(&self, axis: Axis) -> (f64, f64) {
        let value = self.coordinate(axis);
        (value, value)
    }

    #[inline]
    fn distance_squared_to(&self, point: &Point3<f64>) -> f64 {
        nalgebra::distance_squared(&self.position(), point)
    }

    /// Bounding box assembled from the per-axis extents.
    fn bounds(&self) -> BoundingBox {
        let (x0, x1) = self.extent(Axis::X);
        let (y0, y1) = self.extent(Axis::Y);
        let (z0, z1) = self.extent(Axis::Z);
        BoundingBox {
            min: Point3::new(x0, y0, z0),
            max: Point3::new(x1, y1, z1),
        }
    }
}

impl SpatialItem for Point3<f64> {
    #[inline]
    fn position(&self) -> Point3<f64> {
        *self
    }

    #[inline]
    fn coordinate(&self, axis: Axis) -> f64 {
        axis.of(self)
    }
}

impl SpatialItem for BoundingBox {
    fn position(&self) -> Point3<f64> {
        self.centre()
    }

    fn extent(&self, axis: Axis) -> (f64, f64) {
        (self.min_on(axis), self.max_on(axis))
    }

    fn distance_squared_to(&self, point: &Point3<f64>) -> f64 {
        BoundingBox::distance_squared_to(self, point)
    }

    fn bounds(&self) -> BoundingBox {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_extent_is_degenerate() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(p.extent(Axis::Y), (2.0, 2.0));
        assert_eq!(SpatialItem::bounds(&p), BoundingBox::from_point(p));
    }

    #[test]
    fn box_item_routes_by_centre() {
        let b = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 6.0));

        assert_eq!(b.coordinate(Axis::Z), 3.0);
        assert_eq!(b.extent(Axis::Y), (0.0, 4.0));
        assert_eq!(SpatialItem::distance_squared_to(&b, &Point3::new(1.0, 1.0, 1.0)), 0.0);
    }
}
