// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delaunay bad-face lookup strategies compared.
//!
//! Run with: cargo bench -p nucleus-geometry --bench triangulation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nucleus_geometry::{triangulate, DelaunayOptions, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn scatter(n: usize) -> Vec<Point3<f64>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| {
            Point3::new(
                rng.random_range(0.0..1000.0),
                rng.random_range(0.0..1000.0),
                0.0,
            )
        })
        .collect()
}

fn bench_triangulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulate");
    group.sample_size(10);
    let strategies = [
        ("scan", DelaunayOptions::default()),
        ("sweep", DelaunayOptions::default().with_sweep_pruning(true)),
        ("index", DelaunayOptions::default().with_spatial_index(true)),
    ];
    for n in [500, 2_000] {
        let points = scatter(n);
        for (name, options) in &strategies {
            group.bench_with_input(BenchmarkId::new(*name, n), &points, |b, points| {
                b.iter(|| black_box(triangulate(points, options).unwrap().len()))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_triangulate);
criterion_main!(benches);
