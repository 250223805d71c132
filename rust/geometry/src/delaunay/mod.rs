// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental Delaunay triangulation in the XY plane
//!
//! Bowyer–Watson insertion starting from a super-triangle that encloses the
//! (expanded) bounds of the input. For each vertex, every face whose
//! circumcircle strictly contains it is evicted; the boundary of the evicted
//! region is re-triangulated as a fan around the new vertex. Faces touching
//! the super-triangle are dropped at the end, along with any face whose area
//! is within tolerance of zero.
//!
//! Bad faces are found either by a linear scan (optionally pruned by a left
//! to right sweep) or through a [`DdTree`] over circumcircle boxes.

mod face;

pub use face::{Circumcircle, TriangleFace};

use nalgebra::Point3;
use nucleus_core::{Axis, BoundingBox};
use nucleus_spatial::{DdTree, SpatialItem, TreeConfig};
use rustc_hash::FxHashMap;

use crate::builder::MeshBuilder;
use crate::error::Result;

/// Triangulation settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DelaunayOptions {
    /// Extra bounds merged with the bounds of the input
    pub bounds: Option<BoundingBox>,
    /// Bounds are grown by this many times their largest XY side before the
    /// super-triangle is built around them
    pub margin_factor: f64,
    /// Skip vertices within `tolerance` (XY) of one already inserted
    pub strict: bool,
    /// Duplicate distance and zero-area threshold
    pub tolerance: f64,
    /// Insert in ascending X and stop testing faces the sweep has passed
    pub sweep_pruning: bool,
    /// Locate bad faces through a spatial index of circumcircles
    pub spatial_index: bool,
}

impl Default for DelaunayOptions {
    fn default() -> Self {
        Self {
            bounds: None,
            margin_factor: 10.0,
            strict: true,
            tolerance: 1e-9,
            sweep_pruning: false,
            spatial_index: false,
        }
    }
}

impl DelaunayOptions {
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_margin_factor(mut self, margin_factor: f64) -> Self {
        self.margin_factor = margin_factor;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_sweep_pruning(mut self, sweep_pruning: bool) -> Self {
        self.sweep_pruning = sweep_pruning;
        self
    }

    pub fn with_spatial_index(mut self, spatial_index: bool) -> Self {
        self.spatial_index = spatial_index;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.margin_factor.is_finite() && self.margin_factor > 0.0) {
            return Err(nucleus_core::Error::InvalidConfig(format!(
                "margin_factor must be finite and positive, got {}",
                self.margin_factor
            ))
            .into());
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(nucleus_core::Error::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            ))
            .into());
        }
        Ok(())
    }
}

/// Circumcircles wider than this fraction of the input's largest XY side
/// are scanned linearly instead of indexed.
const LOOSE_RADIUS_FRACTION: f64 = 0.125;

/// Evicted entries tolerated in the index before it is rebuilt.
const MIN_STALE_FOR_REBUILD: usize = 64;

/// Circumcircle entry in the face index, keyed by the circle's XY box.
/// `slot` points into the face table.
#[derive(Debug, Clone, Copy)]
struct IndexedFace {
    slot: usize,
    circle: Circumcircle,
}

impl SpatialItem for IndexedFace {
    fn position(&self) -> Point3<f64> {
        Point3::new(self.circle.centre.x, self.circle.centre.y, 0.0)
    }

    fn extent(&self, axis: Axis) -> (f64, f64) {
        let r = self.circle.radius();
        match axis {
            Axis::X => (self.circle.centre.x - r, self.circle.centre.x + r),
            Axis::Y => (self.circle.centre.y - r, self.circle.centre.y + r),
            Axis::Z => (0.0, 0.0),
        }
    }
}

/// Faces located through a [`DdTree`] of their circumcircles.
///
/// Evicted faces are cleared from the face table and left in the tree until
/// they make up half of it, at which point the tree is rebuilt from the live
/// faces. Faces on the super-triangle, degenerate faces and faces with very
/// wide circles stay out of the tree in `loose`.
struct FaceIndex {
    tree: DdTree<IndexedFace>,
    faces: Vec<Option<TriangleFace>>,
    loose: Vec<TriangleFace>,
    stale: usize,
    first_super: usize,
    loose_radius: f64,
}

impl FaceIndex {
    fn new(first_super: usize, loose_radius: f64) -> Self {
        Self {
            tree: DdTree::new(),
            faces: Vec::new(),
            loose: Vec::new(),
            stale: 0,
            first_super,
            loose_radius,
        }
    }

    fn insert(&mut self, face: TriangleFace, vertices: &[Point3<f64>]) {
        let circle = *face.circumcircle(vertices);
        let loose = circle.is_degenerate()
            || !(circle.radius() <= self.loose_radius)
            || face.vertices.iter().any(|&v| v >= self.first_super);
        if loose {
            self.loose.push(face);
            return;
        }
        let slot = self.faces.len();
        self.faces.push(Some(face));
        self.tree.add(IndexedFace { slot, circle });
    }

    fn take_bad(
        &mut self,
        vertices: &[Point3<f64>],
        point: &Point3<f64>,
        bad: &mut Vec<TriangleFace>,
    ) -> Result<()> {
        let window = BoundingBox::from_point(Point3::new(point.x, point.y, 0.0));
        for key in self.tree.items_inside(&window) {
            let Some(item) = self.tree.get(key) else {
                continue;
            };
            if item.circle.contains_xy(point) {
                if let Some(face) = self.faces[item.slot].take() {
                    bad.push(face);
                    self.stale += 1;
                }
            }
        }

        let mut i = 0;
        while i < self.loose.len() {
            if self.loose[i].xy_circumcircle_contains(vertices, point) {
                bad.push(self.loose.swap_remove(i));
            } else {
                i += 1;
            }
        }

        if self.stale >= MIN_STALE_FOR_REBUILD && self.stale * 2 > self.tree.len() {
            self.rebuild()?;
        }
        Ok(())
    }

    /// Re-indexes the live faces into a fresh tree and face table.
    fn rebuild(&mut self) -> Result<()> {
        let live = self.tree.len() - self.stale;
        let mut faces = Vec::with_capacity(live);
        let mut items = Vec::with_capacity(live);
        for (_, item) in self.tree.iter() {
            if let Some(face) = self.faces[item.slot].take() {
                items.push(IndexedFace {
                    slot: faces.len(),
                    circle: item.circle,
                });
                faces.push(Some(face));
            }
        }

        tracing::trace!(live = items.len(), dropped = self.stale, "Rebuilt face index");
        self.tree = DdTree::from_items(items, TreeConfig::default())?;
        self.faces = faces;
        self.stale = 0;
        Ok(())
    }

    fn into_faces(self) -> Vec<TriangleFace> {
        self.faces.into_iter().flatten().chain(self.loose).collect()
    }
}

/// Live faces, in whichever structure finds bad faces for this run.
enum FaceSet {
    Scan {
        active: Vec<TriangleFace>,
        finished: Vec<TriangleFace>,
        pruning: bool,
    },
    Indexed(FaceIndex),
}

impl FaceSet {
    fn new(options: &DelaunayOptions, first_super: usize, span: f64) -> Self {
        if options.spatial_index {
            FaceSet::Indexed(FaceIndex::new(first_super, span * LOOSE_RADIUS_FRACTION))
        } else {
            FaceSet::Scan {
                active: Vec::new(),
                finished: Vec::new(),
                pruning: options.sweep_pruning,
            }
        }
    }

    fn insert(&mut self, face: TriangleFace, vertices: &[Point3<f64>]) {
        match self {
            FaceSet::Scan { active, .. } => active.push(face),
            FaceSet::Indexed(index) => index.insert(face, vertices),
        }
    }

    /// Moves every face whose circumcircle strictly contains `point` into
    /// `bad`.
    fn take_bad(
        &mut self,
        vertices: &[Point3<f64>],
        point: &Point3<f64>,
        bad: &mut Vec<TriangleFace>,
    ) -> Result<()> {
        match self {
            FaceSet::Scan {
                active,
                finished,
                pruning,
            } => {
                let mut i = 0;
                while i < active.len() {
                    let inside = if *pruning {
                        active[i].xy_circumcircle_contains_quick_check(vertices, point)
                    } else {
                        active[i].xy_circumcircle_contains(vertices, point)
                    };
                    if inside {
                        bad.push(active.swap_remove(i));
                    } else if active[i].is_excluded() {
                        finished.push(active.swap_remove(i));
                    } else {
                        i += 1;
                    }
                }
                Ok(())
            }
            FaceSet::Indexed(index) => index.take_bad(vertices, point, bad),
        }
    }

    fn into_faces(self) -> Vec<TriangleFace> {
        match self {
            FaceSet::Scan {
                mut active,
                finished,
                ..
            } => {
                active.extend(finished);
                active
            }
            FaceSet::Indexed(index) => index.into_faces(),
        }
    }
}

/// Super-triangle corners enclosing `bounds` grown by `margin_factor` times
/// its largest XY side. `None` when the bounds have no XY extent.
fn super_triangle(bounds: &BoundingBox, margin_factor: f64) -> Option<[Point3<f64>; 3]> {
    let size = bounds.size_on(Axis::X).max(bounds.size_on(Axis::Y));
    if !(size > 0.0) {
        return None;
    }
    let grown = bounds.expanded(size * margin_factor);
    let (x0, x1) = (grown.min.x, grown.max.x);
    let (y0, y1) = (grown.min.y, grown.max.y);
    let (w, h) = (x1 - x0, y1 - y0);

    Some([
        Point3::new(x0 - w, y0, 0.0),
        Point3::new(x1 + w, y0, 0.0),
        Point3::new((x0 + x1) * 0.5, y1 + h, 0.0),
    ])
}

/// Triangulates the XY projection of `vertices`.
///
/// Returned faces index into `vertices`, wind counter-clockwise in XY and
/// have their circumcircles cached against `vertices`. Fewer than three
/// usable vertices, or only collinear ones, give no faces. Non-finite
/// vertices are skipped. Only invalid options are an error.
pub fn triangulate(vertices: &[Point3<f64>], options: &DelaunayOptions) -> Result<Vec<TriangleFace>> {
    options.validate()?;

    let mut order: Vec<usize> = (0..vertices.len())
        .filter(|&i| {
            let p = &vertices[i];
            p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
        })
        .collect();
    let non_finite = vertices.len() - order.len();
    if non_finite > 0 {
        tracing::warn!(count = non_finite, "Skipping non-finite vertices");
    }
    if order.len() < 3 {
        return Ok(Vec::new());
    }

    let mut bounds = BoundingBox::from_points(order.iter().map(|&i| &vertices[i]));
    if let Some(extra) = &options.bounds {
        bounds.include_box(extra);
    }
    let Some(corners) = super_triangle(&bounds, options.margin_factor) else {
        return Ok(Vec::new());
    };

    if options.sweep_pruning {
        order.sort_by(|&a, &b| {
            vertices[a]
                .x
                .total_cmp(&vertices[b].x)
                .then(vertices[a].y.total_cmp(&vertices[b].y))
        });
    }

    // Input vertices followed by the three super-triangle corners
    let count = vertices.len();
    let mut points = Vec::with_capacity(count + 3);
    points.extend_from_slice(vertices);
    points.extend_from_slice(&corners);

    let span = bounds.size_on(Axis::X).max(bounds.size_on(Axis::Y));
    let mut faces = FaceSet::new(options, count, span);
    faces.insert(TriangleFace::new(count, count + 1, count + 2), &points);

    let mut inserted: DdTree<Point3<f64>> = DdTree::new();
    let duplicate_bound = (options.tolerance * options.tolerance).max(f64::MIN_POSITIVE);
    let mut skipped = non_finite;
    let mut bad = Vec::new();
    let mut edges: FxHashMap<(usize, usize), u32> = FxHashMap::default();

    for &index in &order {
        let point = points[index];

        if options.strict {
            let flat = Point3::new(point.x, point.y, 0.0);
            if inserted.nearest_to(&flat, duplicate_bound, None).is_some() {
                skipped += 1;
                continue;
            }
            inserted.add(flat);
        }

        bad.clear();
        faces.take_bad(&points, &point, &mut bad)?;
        if bad.is_empty() {
            skipped += 1;
            continue;
        }

        // Edges shared by two evicted faces are interior to the cavity
        edges.clear();
        for face in &bad {
            let [a, b, c] = face.vertices;
            for (p, q) in [(a, b), (b, c), (c, a)] {
                *edges.entry((p.min(q), p.max(q))).or_insert(0) += 1;
            }
        }
        for face in &bad {
            let [a, b, c] = face.vertices;
            for (p, q) in [(a, b), (b, c), (c, a)] {
                if edges[&(p.min(q), p.max(q))] == 1 {
                    faces.insert(TriangleFace::new(p, q, index), &points);
                }
            }
        }
    }

    let mut output: Vec<TriangleFace> = faces
        .into_faces()
        .into_iter()
        .filter(|face| face.vertices.iter().all(|&v| v < count))
        .filter(|face| face.area_xy(&points) > options.tolerance)
        .collect();
    // Cached circles only depend on the real corners, so they stay valid
    // against the caller's slice
    output.sort_by_key(|face| face.vertices);

    tracing::debug!(
        vertices = vertices.len(),
        inserted = order.len() - (skipped - non_finite),
        skipped,
        faces = output.len(),
        "Triangulated vertex set"
    );

    Ok(output)
}

/// Adds every vertex to `builder` (in order, including skipped ones) and then
/// the Delaunay faces as triangles. Returns the number of faces added.
pub fn triangulate_into<B: MeshBuilder + ?Sized>(
    builder: &mut B,
    vertices: &[Point3<f64>],
    options: &DelaunayOptions,
) -> Result<usize> {
    let faces = triangulate(vertices, options)?;
    let first = builder.add_vertices(vertices);
    for face in &faces {
        let [a, b, c] = face.vertices;
        builder.add_triangle(first + a, first + b, first + c);
    }
    Ok(faces.len())
}
