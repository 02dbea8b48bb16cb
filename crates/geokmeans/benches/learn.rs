use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use geokmeans::{EstimatorConfig, EuclideanGeometry, ExecContext, OnlineKmeansEstimator};
use rand::Rng;

const DIM: usize = 3;

fn generate_clustered_points(n: usize, k: usize) -> Vec<f32> {
    let mut rng = geokmeans::rng::new();

    let centers: Vec<f32> = (0..k * DIM).map(|_| rng.random::<f32>() * 8.0).collect();
    let noise = 0.05;

    let mut points = Vec::with_capacity(n * DIM);
    for i in 0..n {
        let c = i % k;
        for d in 0..DIM {
            points.push(centers[c * DIM + d] + (rng.random::<f32>() - 0.5) * noise);
        }
    }
    points
}

fn estimator(k: usize, force_sparse: bool) -> OnlineKmeansEstimator<EuclideanGeometry> {
    let mut cfg = EstimatorConfig::new(k, DIM);
    cfg.force_sparse = force_sparse;
    OnlineKmeansEstimator::new(cfg, EuclideanGeometry, ExecContext::sequential()).unwrap()
}

fn bench(c: &mut Criterion) {
    let ks = [16usize, 64usize];
    let sizes = [("1k", 1_000usize), ("10k", 10_000usize)];

    for &k in &ks {
        let mut group = c.benchmark_group(format!("learn_sparse/k{k}"));
        for &(size_name, size) in &sizes {
            let batch = generate_clustered_points(size, k);
            group.bench_with_input(BenchmarkId::from_parameter(size_name), &batch, |b, batch| {
                b.iter(|| {
                    let mut est = estimator(k, true);
                    est.learn(batch).unwrap();
                    est
                })
            });
        }
        group.finish();

        let mut group = c.benchmark_group(format!("learn_pairwise/k{k}"));
        for &(size_name, size) in &sizes {
            let batch = generate_clustered_points(size, k);
            group.bench_with_input(BenchmarkId::from_parameter(size_name), &batch, |b, batch| {
                b.iter(|| {
                    let mut est = estimator(k, false);
                    est.learn(batch).unwrap();
                    est
                })
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench);
criterion_main!(benches);
