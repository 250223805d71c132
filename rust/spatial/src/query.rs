// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Radius, nearest-neighbour and box queries.
//!
//! Internal nodes start at the branch the query point projects into and walk
//! outwards along the branch array in both directions. Each step computes a
//! lower bound on the distance to anything in that branch (the split-axis
//! gap to the cell, widened by the node's reach) and stops walking in that
//! direction once the bound reaches the query threshold. Leaves are scanned
//! linearly.

use nalgebra::Point3;
use nucleus_core::BoundingBox;
use rustc_hash::FxHashSet;

use crate::item::SpatialItem;
use crate::keys::{ItemKey, NodeKey};
use crate::tree::DdTree;

impl<T: SpatialItem> DdTree<T> {
    /// Returns every item whose squared distance to `point` is strictly less
    /// than `distance_squared`.
    pub fn close_to(&self, point: &Point3<f64>, distance_squared: f64) -> Vec<ItemKey> {
        let mut output = Vec::new();
        self.close_to_into(point, distance_squared, &mut output);
        output
    }

    /// Like [`close_to`](Self::close_to), appending to `output`. Keys already
    /// in `output` are not added again.
    pub fn close_to_into(
        &self,
        point: &Point3<f64>,
        distance_squared: f64,
        output: &mut Vec<ItemKey>,
    ) {
        if self.items.is_empty() || !(distance_squared > 0.0) {
            return;
        }
        let mut seen: FxHashSet<ItemKey> = output.iter().copied().collect();
        self.close_to_node(self.root, point, distance_squared, output, &mut seen);
    }

    fn close_to_node(
        &self,
        key: NodeKey,
        point: &Point3<f64>,
        distance_squared: f64,
        output: &mut Vec<ItemKey>,
        seen: &mut FxHashSet<ItemKey>,
    ) {
        let node = &self.nodes[key];
        let Some(axis) = node.split else {
            for &item_key in &node.items {
                if self.items[item_key].distance_squared_to(point) < distance_squared
                    && seen.insert(item_key)
                {
                    output.push(item_key);
                }
            }
            return;
        };

        let value = axis.of(point);
        let home = node.branch_index(value);
        let mut visit = |index: usize| {
            if let Some(branch) = node.branches[index] {
                self.close_to_node(branch, point, distance_squared, output, seen);
            }
        };

        visit(home);
        for index in home + 1..node.branches.len() {
            if node.separation(index, value).powi(2) >= distance_squared {
                break;
            }
            visit(index);
        }
        for index in (0..home).rev() {
            if node.separation(index, value).powi(2) >= distance_squared {
                break;
            }
            visit(index);
        }
    }

    /// Returns the item closest to `point`, other than `ignore`, whose squared
    /// distance is strictly less than `distance_squared`.
    ///
    /// Only strictly closer candidates replace the current best, so of two
    /// items at the same distance the first one visited wins.
    pub fn nearest_to(
        &self,
        point: &Point3<f64>,
        distance_squared: f64,
        ignore: Option<ItemKey>,
    ) -> Option<ItemKey> {
        if self.items.is_empty() {
            return None;
        }
        let mut bound = distance_squared;
        let mut best = None;
        self.nearest_to_node(self.root, point, ignore, &mut bound, &mut best);
        best
    }

    /// Closest item to `point`, without a distance limit.
    pub fn nearest(&self, point: &Point3<f64>) -> Option<ItemKey> {
        self.nearest_to(point, f64::INFINITY, None)
    }

    fn nearest_to_node(
        &self,
        key: NodeKey,
        point: &Point3<f64>,
        ignore: Option<ItemKey>,
        bound: &mut f64,
        best: &mut Option<ItemKey>,
    ) {
        let node = &self.nodes[key];
        let Some(axis) = node.split else {
            for &item_key in &node.items {
                if Some(item_key) == ignore {
                    continue;
                }
                let d = self.items[item_key].distance_squared_to(point);
                if d < *bound {
                    *bound = d;
                    *best = Some(item_key);
                }
            }
            return;
        };

        let value = axis.of(point);
        let home = node.branch_index(value);
        let count = node.branches.len();

        if let Some(branch) = node.branches[home] {
            self.nearest_to_node(branch, point, ignore, bound, best);
        }

        // The bound only shrinks, so a closed direction stays closed
        let (mut up_open, mut down_open) = (true, true);
        let mut step = 1;
        while up_open || down_open {
            if up_open {
                let index = home + step;
                if index >= count || node.separation(index, value).powi(2) >= *bound {
                    up_open = false;
                } else if let Some(branch) = node.branches[index] {
                    self.nearest_to_node(branch, point, ignore, bound, best);
                }
            }
            if down_open {
                if step > home || node.separation(home - step, value).powi(2) >= *bound {
                    down_open = false;
                } else if let Some(branch) = node.branches[home - step] {
                    self.nearest_to_node(branch, point, ignore, bound, best);
                }
            }
            step += 1;
        }
    }

    /// Returns every item whose bounds overlap `bounds` (inclusive, all three
    /// axes).
    pub fn items_inside(&self, bounds: &BoundingBox) -> Vec<ItemKey> {
        let mut output = Vec::new();
        if self.items.is_empty() || bounds.is_empty() {
            return output;
        }
        self.items_inside_node(self.root, bounds, &mut output);
        output
    }

    fn items_inside_node(&self, key: NodeKey, bounds: &BoundingBox, output: &mut Vec<ItemKey>) {
        let node = &self.nodes[key];
        let Some(axis) = node.split else {
            output.extend(
                node.items
                    .iter()
                    .copied()
                    .filter(|&item_key| self.items[item_key].bounds().overlaps(bounds)),
            );
            return;
        };

        // An item's extent reaches `reach` past its coordinate on either side
        let first = node.branch_index(bounds.min_on(axis) - node.reach.1);
        let last = node.branch_index(bounds.max_on(axis) + node.reach.0);
        for index in first..=last {
            if let Some(branch) = node.branches[index] {
                self.items_inside_node(branch, bounds, output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DdTree, TreeConfig};
    use nalgebra::Point3;
    use nucleus_core::BoundingBox;

    fn grid_tree(config: TreeConfig) -> DdTree<Point3<f64>> {
        let mut points = Vec::new();
        for x in 0..10 {
            for y in 0..10 {
                points.push(Point3::new(x as f64, y as f64, 0.0));
            }
        }
        DdTree::from_items(points, config).unwrap()
    }

    #[test]
    fn queries_on_empty_tree_are_empty() {
        let tree: DdTree<Point3<f64>> = DdTree::new();
        let origin = Point3::origin();

        assert!(tree.close_to(&origin, 100.0).is_empty());
        assert_eq!(tree.nearest(&origin), None);
        assert!(tree
            .items_inside(&BoundingBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0)))
            .is_empty());
    }

    #[test]
    fn close_to_is_strict() {
        let tree = grid_tree(TreeConfig::default().with_max_leaf_population(4));
        let centre = Point3::new(5.0, 5.0, 0.0);

        // Four neighbours sit at exactly distance 1
        let hits = tree.close_to(&centre, 1.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(tree.get(hits[0]), Some(&centre));

        let hits = tree.close_to(&centre, 1.0 + 1e-9);
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn close_to_into_skips_existing_keys() {
        let tree = grid_tree(TreeConfig::default().with_max_leaf_population(4));
        let centre = Point3::new(5.0, 5.0, 0.0);

        let mut output = tree.close_to(&centre, 1.5);
        let before = output.len();
        tree.close_to_into(&centre, 1.5, &mut output);
        assert_eq!(output.len(), before);
    }

    #[test]
    fn nearest_ignores_given_item() {
        let tree = grid_tree(TreeConfig::default().with_max_leaf_population(4));
        let query = Point3::new(3.1, 7.0, 0.0);

        let first = tree.nearest(&query).unwrap();
        assert_eq!(tree.get(first), Some(&Point3::new(3.0, 7.0, 0.0)));

        let second = tree.nearest_to(&query, f64::INFINITY, Some(first)).unwrap();
        assert_eq!(tree.get(second), Some(&Point3::new(4.0, 7.0, 0.0)));
    }

    #[test]
    fn nearest_respects_distance_limit() {
        let tree = grid_tree(TreeConfig::default());
        let far = Point3::new(50.0, 50.0, 0.0);

        assert_eq!(tree.nearest_to(&far, 100.0, None), None);
        assert!(tree.nearest_to(&far, 5000.0, None).is_some());
    }

    #[test]
    fn items_inside_box() {
        let tree = grid_tree(TreeConfig::default().with_max_leaf_population(3));
        let query = BoundingBox::new(Point3::new(1.5, 2.0, -1.0), Point3::new(3.5, 4.0, 1.0));

        let hits = tree.items_inside(&query);
        // x in {2, 3}, y in {2, 3, 4}
        assert_eq!(hits.len(), 6);
        for key in hits {
            assert!(query.contains(tree.get(key).unwrap()));
        }
    }

    #[test]
    fn box_items_found_from_outside_their_cell() {
        let mut boxes = Vec::new();
        for i in 0..20 {
            let x = i as f64 * 10.0;
            boxes.push(BoundingBox::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0)));
        }
        // One wide box whose centre is far from its left end
        boxes.push(BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(190.0, 1.0, 1.0)));
        let tree = DdTree::from_items(boxes, TreeConfig::default().with_max_leaf_population(2)).unwrap();

        let corner = BoundingBox::from_point(Point3::new(0.5, 0.5, 0.5));
        assert_eq!(tree.items_inside(&corner).len(), 2);

        let near = tree.close_to(&Point3::new(-1.0, 0.5, 0.5), 4.0);
        assert_eq!(near.len(), 2);
    }
}
