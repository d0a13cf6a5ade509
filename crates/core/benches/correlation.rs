//! Benchmarks for correlation metrics.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quiver_core::{l2_distance_squared, Correlation, VectorValues};
use rand::Rng;
use std::collections::BTreeMap;

fn random_dense(dim: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn random_sparse(dim: usize, nnz: usize) -> BTreeMap<usize, f32> {
    let mut rng = rand::thread_rng();
    (0..nnz)
        .map(|_| (rng.gen_range(0..dim), rng.gen_range(-1.0..1.0)))
        .collect()
}

fn bench_l2_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("l2_distance_squared");

    for dim in [128, 256, 512, 1024].iter() {
        let a = random_dense(*dim);
        let b = random_dense(*dim);

        group.throughput(Throughput::Elements(*dim as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |bench, _| {
            bench.iter(|| l2_distance_squared(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_dense_correlations(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_correlation");
    let dim = 256;
    let a = VectorValues::Dense(random_dense(dim));
    let b = VectorValues::Dense(random_dense(dim));

    for metric in Correlation::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(metric), &metric, |bench, metric| {
            bench.iter(|| metric.coefficient(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_sparse_correlations(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_correlation");
    let dim = 100_000;

    for nnz in [16, 128, 1024].iter() {
        let a = VectorValues::Sparse(random_sparse(dim, *nnz));
        let b = VectorValues::Sparse(random_sparse(dim, *nnz));

        group.throughput(Throughput::Elements(*nnz as u64));
        group.bench_with_input(BenchmarkId::new("euclidean", nnz), nnz, |bench, _| {
            bench.iter(|| Correlation::Euclidean.coefficient(black_box(&a), black_box(&b)))
        });
        group.bench_with_input(BenchmarkId::new("jaccard", nnz), nnz, |bench, _| {
            bench.iter(|| Correlation::Jaccard.coefficient(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_l2_kernel,
    bench_dense_correlations,
    bench_sparse_correlations
);
criterion_main!(benches);
