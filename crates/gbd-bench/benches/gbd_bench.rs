//! Benchmarks for gamut building and queries.
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use gbd::{Gamut, GamutBuilder};

/// Points on an ellipsoid about L = 50, evenly spread by a Fibonacci spiral.
fn ellipsoid(n: usize) -> Vec<[f64; 3]> {
    let golden = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).sqrt();
            let phi = golden * i as f64;
            [50.0 + 45.0 * y, 80.0 * r * phi.cos(), 70.0 * r * phi.sin()]
        })
        .collect()
}

fn built(n: usize) -> Gamut {
    let mut g = GamutBuilder::new().build();
    for p in ellipsoid(n) {
        g.expand(p);
    }
    g.triangulate().expect("triangulate");
    g
}

/// Benchmark sample insertion plus triangulation.
fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");

    for size in [1000, 10000].iter() {
        let points = ellipsoid(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("expand", size), &points, |b, pts| {
            b.iter(|| {
                let mut g = GamutBuilder::new().build();
                for &p in pts {
                    g.expand(black_box(p));
                }
                g
            })
        });

        group.bench_with_input(BenchmarkId::new("expand_triangulate", size), &points, |b, pts| {
            b.iter(|| {
                let mut g = GamutBuilder::new().build();
                for &p in pts {
                    g.expand(black_box(p));
                }
                g.triangulate().expect("triangulate");
                g
            })
        });
    }

    group.finish();
}

/// Benchmark queries against a built surface.
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let gamut = built(5000);
    let probes: Vec<[f64; 3]> = ellipsoid(1000)
        .into_iter()
        .map(|p| [50.0 + (p[0] - 50.0) * 1.3, p[1] * 0.7, p[2] * 1.1])
        .collect();
    // Indices are built lazily; warm them up outside the timing
    gamut.radial(probes[0]).expect("radial");
    gamut.nearest(probes[0]).expect("nearest");

    group.throughput(Throughput::Elements(probes.len() as u64));

    group.bench_function("radial", |b| {
        b.iter(|| {
            for &p in &probes {
                black_box(gamut.radial(black_box(p)).expect("radial"));
            }
        })
    });

    group.bench_function("nearest", |b| {
        b.iter(|| {
            for &p in &probes {
                black_box(gamut.nearest(black_box(p)).expect("nearest"));
            }
        })
    });

    group.bench_function("vector_isect", |b| {
        b.iter(|| {
            for &p in &probes {
                black_box(gamut.vector_isect(black_box(p), [50.0, 0.0, 0.0]).expect("isect"));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_expand, bench_queries);
criterion_main!(benches);
