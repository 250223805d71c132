// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the DD-Tree.
//!
//! The [`DdTree`] owns two slot maps: one for the items and one for the
//! nodes. A node becomes internal exactly once, when it subdivides; from then
//! on its split axis, origin and cell size are fixed and its items are
//! distributed over a sparse array of branch slots. Nodes are never removed,
//! so a [`NodeKey`] stays valid for the lifetime of the tree.
//!
//! ## Routing
//!
//! An item with coordinate `v` on the split axis belongs to branch
//! `floor((v - origin) / cell_size)`, clamped into `[0, branch_count - 1]`.
//! The same item is also listed in every ancestor of that branch, up to the
//! root.

use nucleus_core::{Axis, BoundingBox, Result};
use slotmap::SlotMap;

use crate::config::TreeConfig;
use crate::item::SpatialItem;
use crate::keys::{ItemKey, NodeKey};

/// A node of the tree: a leaf until it subdivides, internal afterwards.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) origin: f64,
    pub(crate) cell_size: f64,
    /// `None` while the node is a leaf.
    pub(crate) split: Option<Axis>,
    pub(crate) branches: Vec<Option<NodeKey>>,
    /// Every item at or below this node.
    pub(crate) items: Vec<ItemKey>,
    /// How far item extents stick out below and above their coordinate on the
    /// split axis. Grows on insertion, never shrinks.
    pub(crate) reach: (f64, f64),
    /// Population a leaf must reach before an insertion tries to split it
    /// again after a failed attempt.
    pub(crate) retry_at: usize,
}

impl TreeNode {
    fn leaf() -> Self {
        Self {
            origin: 0.0,
            cell_size: 0.0,
            split: None,
            branches: Vec::new(),
            items: Vec::new(),
            reach: (0.0, 0.0),
            retry_at: 0,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }

    /// Split axis, or `None` for a leaf.
    #[inline]
    pub fn split_axis(&self) -> Option<Axis> {
        self.split
    }

    /// Offset of the first cell's lower edge along the split axis.
    #[inline]
    pub fn origin(&self) -> f64 {
        self.origin
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of branch slots (0 for a leaf).
    #[inline]
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Branch slots in order; empty slots are `None`.
    pub fn branches(&self) -> &[Option<NodeKey>] {
        &self.branches
    }

    /// Items at or below this node.
    pub fn items(&self) -> &[ItemKey] {
        &self.items
    }

    /// Membership test against this node's own list.
    pub fn contains(&self, key: ItemKey) -> bool {
        self.items.contains(&key)
    }

    /// Branch index for a coordinate on the split axis, clamped into range.
    ///
    /// # Panics
    ///
    /// Panics if the node is a leaf.
    #[inline]
    pub fn branch_index(&self, value: f64) -> usize {
        let count = self.branches.len();
        assert!(count > 0, "branch_index called on a leaf node");
        route(value, self.origin, self.cell_size, count)
    }

    /// Lower bound on the split-axis separation between `value` and any item
    /// routed into branch `index`, widened by the node's reach. The end
    /// branches are open towards infinity because clamping can route items
    /// there from outside the grid.
    pub(crate) fn separation(&self, index: usize, value: f64) -> f64 {
        let lo = if index == 0 {
            f64::NEG_INFINITY
        } else {
            self.origin + index as f64 * self.cell_size - self.reach.0
        };
        let hi = if index + 1 == self.branches.len() {
            f64::INFINITY
        } else {
            self.origin + (index + 1) as f64 * self.cell_size + self.reach.1
        };

        if value < lo {
            lo - value
        } else if value > hi {
            value - hi
        } else {
            0.0
        }
    }

    fn widen_reach(&mut self, (below, above): (f64, f64)) {
        self.reach.0 = self.reach.0.max(below);
        self.reach.1 = self.reach.1.max(above);
    }
}

/// Clamped cell index of `value` in a grid of `count` cells.
#[inline]
fn route(value: f64, origin: f64, cell_size: f64, count: usize) -> usize {
    let raw = ((value - origin) / cell_size).floor();
    if raw >= (count - 1) as f64 {
        count - 1
    } else if raw > 0.0 {
        raw as usize
    } else {
        // Also catches NaN
        0
    }
}

/// Grid chosen for a node that is about to subdivide.
#[derive(Debug, Clone, Copy)]
struct Split {
    axis: Axis,
    origin: f64,
    cell_size: f64,
    divisions: usize,
}

/// How far an item's extent sticks out below and above its coordinate.
#[inline]
fn item_reach<T: SpatialItem>(axis: Axis, item: &T) -> (f64, f64) {
    let value = item.coordinate(axis);
    let (lo, hi) = item.extent(axis);
    (value - lo, hi - value)
}

/// Multi-way spatial partition tree over items implementing [`SpatialItem`].
///
/// # Example
///
/// ```
/// use nucleus_spatial::{DdTree, Point3, TreeConfig};
///
/// let config = TreeConfig::default().with_max_leaf_population(2);
/// let mut tree = DdTree::with_config(config).unwrap();
/// for x in 0..10 {
///     tree.add(Point3::new(x as f64, 0.0, 0.0));
/// }
///
/// assert_eq!(tree.len(), 10);
/// assert!(!tree.node(tree.root()).unwrap().is_leaf());
/// ```
#[derive(Debug, Clone)]
pub struct DdTree<T> {
    config: TreeConfig,
    pub(crate) items: SlotMap<ItemKey, T>,
    pub(crate) nodes: SlotMap<NodeKey, TreeNode>,
    pub(crate) root: NodeKey,
}

impl<T: SpatialItem> DdTree<T> {
    /// Creates an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::build(TreeConfig::default())
    }

    /// Creates an empty tree, rejecting an out-of-range configuration.
    pub fn with_config(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Creates a tree holding `items`.
    ///
    /// All items are listed at the root first and split in one pass, which
    /// sees the full extent of the population rather than the first few
    /// insertions.
    pub fn from_items<I>(items: I, config: TreeConfig) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut tree = Self::with_config(config)?;
        let root = tree.root;
        for item in items {
            let key = tree.items.insert(item);
            tree.nodes[root].items.push(key);
        }
        if tree.nodes[root].items.len() > tree.config.max_leaf_population {
            tree.subdivide_node(root);
        }
        Ok(tree)
    }

    fn build(config: TreeConfig) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(TreeNode::leaf());
        Self {
            config,
            items: SlotMap::with_key(),
            nodes,
            root,
        }
    }

    // --- Item operations ---

    /// Adds an item, subdividing leaves that grow past the population limit.
    pub fn add(&mut self, item: T) -> ItemKey {
        let key = self.items.insert(item);
        self.insert_from(self.root, key);
        key
    }

    /// Adds every item from an iterator, returning their keys in order.
    pub fn extend<I>(&mut self, items: I) -> Vec<ItemKey>
    where
        I: IntoIterator<Item = T>,
    {
        items.into_iter().map(|item| self.add(item)).collect()
    }

    fn insert_from(&mut self, start: NodeKey, key: ItemKey) {
        let mut current = start;
        loop {
            let item = &self.items[key];
            let node = &mut self.nodes[current];
            node.items.push(key);

            let Some(axis) = node.split else {
                let population = node.items.len();
                if population > self.config.max_leaf_population && population >= node.retry_at {
                    self.subdivide_node(current);
                }
                return;
            };

            node.widen_reach(item_reach(axis, item));
            let index = node.branch_index(item.coordinate(axis));
            let slot = node.branches[index];
            current = match slot {
                Some(branch) => branch,
                None => {
                    let branch = self.nodes.insert(TreeNode::leaf());
                    self.nodes[current].branches[index] = Some(branch);
                    tracing::trace!(index, "Created tree branch");
                    branch
                }
            };
        }
    }

    /// Removes an item by key, returning it.
    pub fn remove(&mut self, key: ItemKey) -> Option<T> {
        let item = self.items.get(key)?;

        let mut current = Some(self.root);
        while let Some(node_key) = current {
            let node = &mut self.nodes[node_key];
            match node.items.iter().position(|&k| k == key) {
                Some(pos) => {
                    node.items.remove(pos);
                }
                None => break,
            }
            current = node
                .split
                .and_then(|axis| node.branches[node.branch_index(item.coordinate(axis))]);
        }

        self.items.remove(key)
    }

    /// Removes the first item equal to `item`, in insertion order.
    pub fn remove_item(&mut self, item: &T) -> bool
    where
        T: PartialEq,
    {
        let found = self.nodes[self.root]
            .items
            .iter()
            .copied()
            .find(|&k| self.items.get(k) == Some(item));

        match found {
            Some(key) => self.remove(key).is_some(),
            None => false,
        }
    }

    /// Returns `true` if the key refers to an item still in the tree.
    pub fn contains_key(&self, key: ItemKey) -> bool {
        self.items.contains_key(key)
    }

    /// Returns `true` if an item equal to `item` is in the tree.
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.items.values().any(|stored| stored == item)
    }

    /// Returns the item for the given key, or `None` if not found.
    pub fn get(&self, key: ItemKey) -> Option<&T> {
        self.items.get(key)
    }

    /// Returns the number of items in the tree.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all items with their keys.
    pub fn iter(&self) -> impl Iterator<Item = (ItemKey, &T)> {
        self.items.iter()
    }

    // --- Node operations ---

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Returns the node for the given key, or `None` if not found.
    pub fn node(&self, key: NodeKey) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    /// Returns the number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels below the root (0 while the root is a leaf).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &SlotMap<NodeKey, TreeNode>, key: NodeKey) -> usize {
            nodes[key]
                .branches
                .iter()
                .flatten()
                .map(|&branch| 1 + walk(nodes, branch))
                .max()
                .unwrap_or(0)
        }
        walk(&self.nodes, self.root)
    }

    /// Subdivides the root if it is still a leaf. Returns `true` if the root
    /// is internal afterwards.
    pub fn subdivide(&mut self) -> bool {
        self.subdivide_node(self.root);
        !self.nodes[self.root].is_leaf()
    }

    /// Grid for splitting `keys` along `axis`, or `None` if the limits leave
    /// fewer than two divisions or every item would route into one branch.
    fn plan_split(&self, keys: &[ItemKey], bounds: &BoundingBox, axis: Axis) -> Option<Split> {
        let count = keys.len();
        let extent = bounds.size_on(axis);
        if !(extent > 0.0) {
            return None;
        }

        // Saturating cast; a huge ratio is capped by the other two limits
        let by_cell_size = (extent / self.config.min_cell_size).floor() as usize;
        let divisions = count
            .min(self.config.max_divisions)
            .min(by_cell_size.saturating_add(1));
        if divisions <= 1 {
            return None;
        }

        let cell_size = extent / (divisions - 1) as f64;
        let origin = bounds.min_on(axis) - cell_size / 2.0;

        let index_of = |k: ItemKey| route(self.items[k].coordinate(axis), origin, cell_size, divisions);
        let first = index_of(keys[0]);
        keys[1..]
            .iter()
            .any(|&k| index_of(k) != first)
            .then_some(Split {
                axis,
                origin,
                cell_size,
                divisions,
            })
    }

    /// Turns a leaf into an internal node.
    ///
    /// The split axis is the one with the greatest extent across the items'
    /// bounds. When that axis would route every item into one branch (items
    /// with extents sharing a coordinate), the next widest axis is tried.
    /// Nothing happens for fewer than two items or when no axis separates
    /// them; an insertion then only retries once the population has doubled.
    fn subdivide_node(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        let count = node.items.len();
        if node.split.is_some() || count < 2 {
            return;
        }

        let mut bounds = BoundingBox::empty();
        for &item_key in &node.items {
            bounds.include_box(&self.items[item_key].bounds());
        }

        // Stable sort keeps the lower axis first on ties
        let mut axes = Axis::ALL;
        axes.sort_by(|a, b| bounds.size_on(*b).total_cmp(&bounds.size_on(*a)));

        let keys = node.items.clone();
        let Some(Split {
            axis,
            origin,
            cell_size,
            divisions,
        }) = axes
            .iter()
            .find_map(|&axis| self.plan_split(&keys, &bounds, axis))
        else {
            self.nodes[key].retry_at = count.saturating_mul(2);
            tracing::trace!(items = count, "Tree node left unsplit");
            return;
        };

        let node = &mut self.nodes[key];
        node.split = Some(axis);
        node.cell_size = cell_size;
        node.origin = origin;
        node.branches = vec![None; divisions];
        for &item_key in &keys {
            node.widen_reach(item_reach(axis, &self.items[item_key]));
        }

        for item_key in keys {
            let index = self.nodes[key].branch_index(self.items[item_key].coordinate(axis));
            let slot = self.nodes[key].branches[index];
            let branch = match slot {
                Some(branch) => branch,
                None => {
                    let branch = self.nodes.insert(TreeNode::leaf());
                    self.nodes[key].branches[index] = Some(branch);
                    branch
                }
            };
            self.nodes[branch].items.push(item_key);
        }

        tracing::debug!(
            axis = %axis,
            divisions,
            items = count,
            cell_size,
            "Subdivided tree node"
        );

        // A branch holding the whole population would split identically
        let branches: Vec<NodeKey> = self.nodes[key].branches.iter().flatten().copied().collect();
        for branch in branches {
            let population = self.nodes[branch].items.len();
            if population > self.config.max_leaf_population && population < count {
                self.subdivide_node(branch);
            }
        }
    }
}

impl<T: SpatialItem> Default for DdTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn line_of_points(n: usize) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn small_population_stays_leaf() {
        let mut tree = DdTree::new();
        for p in line_of_points(10) {
            tree.add(p);
        }

        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.items().len(), 10);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn exceeding_population_splits_along_widest_axis() {
        let mut tree = DdTree::new();
        for i in 0..11 {
            tree.add(Point3::new(0.0, i as f64 * 2.0, 0.5));
        }

        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.split_axis(), Some(Axis::Y));
        assert_eq!(root.branch_count(), 10);
        assert_relative_eq!(root.cell_size(), 20.0 / 9.0, epsilon = 1e-12);
        assert_relative_eq!(root.origin(), -root.cell_size() / 2.0, epsilon = 1e-12);
        // Root keeps the full population
        assert_eq!(root.items().len(), 11);
    }

    #[test]
    fn every_item_reaches_exactly_one_branch() {
        let config = TreeConfig::default().with_max_leaf_population(3);
        let tree = DdTree::from_items(line_of_points(40), config).unwrap();

        let root = tree.node(tree.root()).unwrap();
        let listed: usize = root
            .branches()
            .iter()
            .flatten()
            .map(|&b| tree.node(b).unwrap().items().len())
            .sum();
        assert_eq!(listed, 40);
        assert!(tree.depth() >= 1);
    }

    #[test]
    fn duplicate_points_do_not_subdivide() {
        let mut tree = DdTree::new();
        for _ in 0..50 {
            tree.add(Point3::new(1.0, 1.0, 1.0));
        }

        assert!(tree.node(tree.root()).unwrap().is_leaf());
        assert!(!tree.subdivide());
        assert_eq!(tree.len(), 50);
    }

    #[test]
    fn min_cell_size_limits_divisions() {
        let config = TreeConfig::default()
            .with_max_leaf_population(1)
            .with_min_cell_size(5.0);
        let tree = DdTree::from_items(line_of_points(11), config).unwrap();

        // Extent 10 with 5-unit cells allows floor(10 / 5) + 1 = 3 divisions
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.branch_count(), 3);
        assert_eq!(root.cell_size(), 5.0);
    }

    #[test]
    fn branch_index_clamps() {
        let config = TreeConfig::default().with_max_leaf_population(1);
        let tree = DdTree::from_items(line_of_points(5), config).unwrap();
        let root = tree.node(tree.root()).unwrap();

        assert_eq!(root.branch_index(-100.0), 0);
        assert_eq!(root.branch_index(100.0), root.branch_count() - 1);
        assert_eq!(root.branch_index(f64::NAN), 0);
        assert_eq!(root.branch_index(2.0), 2);
    }

    #[test]
    fn empty_slots_get_branches_on_demand() {
        let config = TreeConfig::default().with_max_leaf_population(2);
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(20.0, 0.0, 0.0),
        ];
        let mut tree = DdTree::from_items(points, config).unwrap();

        // Cells of 10 centred on 0, 10 and 20; the middle one starts empty
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.branch_count(), 3);
        assert!(root.branches()[1].is_none());
        let before = tree.node_count();

        let key = tree.add(Point3::new(9.0, 0.0, 0.0));
        let middle = tree.node(tree.root()).unwrap().branches()[1].unwrap();
        assert!(tree.node(middle).unwrap().contains(key));
        assert_eq!(tree.node_count(), before + 1);
    }

    #[test]
    fn out_of_range_insertions_clamp_into_end_branches() {
        let config = TreeConfig::default().with_max_leaf_population(2);
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(20.0, 0.0, 0.0),
        ];
        let mut tree = DdTree::from_items(points, config).unwrap();

        let low = tree.add(Point3::new(-500.0, 0.0, 0.0));
        let high = tree.add(Point3::new(500.0, 0.0, 0.0));
        let root = tree.node(tree.root()).unwrap();
        let first = root.branches()[0].unwrap();
        let last = root.branches()[2].unwrap();

        assert!(tree.node(first).unwrap().contains(low));
        assert!(tree.node(last).unwrap().contains(high));
    }

    #[test]
    fn remove_unlinks_from_every_level() {
        let config = TreeConfig::default().with_max_leaf_population(2);
        let mut tree = DdTree::with_config(config).unwrap();
        let keys = tree.extend(line_of_points(30));

        let removed = tree.remove(keys[7]);
        assert_eq!(removed, Some(Point3::new(7.0, 0.0, 0.0)));
        assert!(!tree.contains_key(keys[7]));
        assert!(tree.nodes.values().all(|node| !node.contains(keys[7])));
        assert_eq!(tree.len(), 29);

        assert_eq!(tree.remove(keys[7]), None);
    }

    #[test]
    fn remove_and_contains_by_value() {
        let mut tree = DdTree::new();
        tree.extend(line_of_points(3));

        assert!(tree.contains(&Point3::new(1.0, 0.0, 0.0)));
        assert!(tree.remove_item(&Point3::new(1.0, 0.0, 0.0)));
        assert!(!tree.contains(&Point3::new(1.0, 0.0, 0.0)));
        assert!(!tree.remove_item(&Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TreeConfig::default().with_max_divisions(0);
        assert!(DdTree::<Point3<f64>>::with_config(config).is_err());
    }

    #[test]
    fn box_items_fall_back_to_an_axis_that_separates_them() {
        // Centres coincide on X, the widest axis, so Y is used instead
        let boxes: Vec<BoundingBox> = (0..4)
            .map(|i| {
                let y = i as f64 * 0.1;
                BoundingBox::new(Point3::new(-50.0, y, 0.0), Point3::new(50.0, y + 0.1, 0.0))
            })
            .collect();
        let config = TreeConfig::default().with_max_leaf_population(1);
        let tree = DdTree::from_items(boxes, config).unwrap();

        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.split_axis(), Some(Axis::Y));
        assert_eq!(root.branch_count(), 4);
        let occupied: Vec<_> = root.branches().iter().flatten().collect();
        assert_eq!(occupied.len(), 4);
        for branch in occupied {
            let node = tree.node(*branch).unwrap();
            assert!(node.is_leaf());
            assert_eq!(node.items().len(), 1);
        }
        let window = BoundingBox::new(Point3::new(40.0, 0.12, 0.0), Point3::new(45.0, 0.18, 0.0));
        assert_eq!(tree.items_inside(&window).len(), 1);
    }

    fn concentric_boxes(count: usize) -> Vec<BoundingBox> {
        (1..=count)
            .map(|i| {
                let h = i as f64;
                BoundingBox::new(Point3::new(-h, -0.5, -0.5), Point3::new(h, 0.5, 0.5))
            })
            .collect()
    }

    #[test]
    fn concentric_boxes_stay_in_one_leaf() {
        let tree = DdTree::from_items(concentric_boxes(400), TreeConfig::default()).unwrap();
        let root = tree.node(tree.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.close_to(&Point3::origin(), 1.0).len(), 400);

        let outer = BoundingBox::new(Point3::new(390.5, 0.0, 0.0), Point3::new(391.0, 0.0, 0.0));
        assert_eq!(tree.items_inside(&outer).len(), 10);
    }

    #[test]
    fn concentric_boxes_added_one_by_one_stay_shallow() {
        let mut tree = DdTree::new();
        for item in concentric_boxes(400) {
            tree.add(item);
        }
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.depth(), 0);
        // Failed split is retried only after the population doubles
        assert!(tree.node(tree.root()).unwrap().retry_at > 400);
        assert_eq!(tree.close_to(&Point3::origin(), 1.0).len(), 400);
    }

    #[test]
    fn concentric_boxes_mixed_with_points_still_split() {
        let mut tree = DdTree::from_items(concentric_boxes(200), TreeConfig::default()).unwrap();
        for i in 0..200 {
            let x = i as f64 * 2.0 + 1.0;
            tree.add(BoundingBox::from_point(Point3::new(x, 0.0, 0.0)));
        }
        assert!(!tree.node(tree.root()).unwrap().is_leaf());
        assert!(tree.depth() < 10);
        assert_eq!(tree.len(), 400);
        // Every box reaches the origin, points do not
        assert_eq!(tree.close_to(&Point3::origin(), 0.25).len(), 200);
        let window = BoundingBox::new(Point3::new(150.5, 0.0, 0.0), Point3::new(151.5, 0.0, 0.0));
        // Boxes with half width of at least 151 plus the point at 151
        assert_eq!(tree.items_inside(&window).len(), 50 + 1);
    }
}
