//! Benchmarks for mesh operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hullmesh::prelude::*;
use nalgebra::Point3;

/// Points spread evenly over the unit sphere (Fibonacci lattice).
fn sphere_points(n: usize) -> Vec<Point3<f64>> {
    let golden = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f64;
            Point3::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

/// Points on a jittered grid filling the unit cube, most of them interior.
fn cube_points(n: usize) -> Vec<Point3<f64>> {
    let mut points = Vec::with_capacity(n * n * n);
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let jitter = ((i * 7 + j * 13 + k * 31) % 17) as f64 * 1e-3;
                points.push(Point3::new(
                    i as f64 + jitter,
                    j as f64 - jitter,
                    k as f64 + 0.5 * jitter,
                ));
            }
        }
    }
    points
}

fn bench_hull_construction(c: &mut Criterion) {
    let options = HullOptions::default().with_validation(false);
    let mut group = c.benchmark_group("convex_hull");

    for n in [100, 500, 2000] {
        let points = sphere_points(n);
        group.bench_with_input(BenchmarkId::new("sphere", n), &points, |b, points| {
            b.iter(|| convex_hull(black_box(points), &options).unwrap());
        });
    }

    let points = cube_points(10);
    group.bench_function("jittered_cube_1000", |b| {
        b.iter(|| convex_hull(black_box(&points), &options).unwrap());
    });

    group.finish();
}

fn bench_mesh_traversal(c: &mut Criterion) {
    let options = HullOptions::default().with_validation(false);
    let hull = convex_hull(&sphere_points(2000), &options).unwrap();
    let mesh = hull.mesh();

    c.bench_function("vertex_neighbors_all", |b| {
        b.iter(|| {
            let mut count = 0;
            for v in mesh.connected_vertex_ids() {
                count += mesh.neighbors_of(v).unwrap().count();
            }
            count
        });
    });

    c.bench_function("face_normals_all", |b| {
        b.iter(|| {
            let mut sum = nalgebra::Vector3::zeros();
            for f in mesh.face_ids() {
                sum += mesh.face_normal(f).unwrap();
            }
            sum
        });
    });

    c.bench_function("validate", |b| {
        b.iter(|| mesh.validate().unwrap());
    });
}

criterion_group!(benches, bench_hull_construction, bench_mesh_traversal);
criterion_main!(benches);
