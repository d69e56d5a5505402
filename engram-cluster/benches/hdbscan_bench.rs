use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engram_cluster::{Hdbscan, HdbscanOptions};
use engram_core::config::DistanceMetric;
use test_fixtures::gaussian_blobs;

fn bench_hdbscan(c: &mut Criterion) {
    let centers: Vec<Vec<f32>> = (0..4)
        .map(|b| {
            let mut center = vec![0.0f32; 32];
            center[b * 8] = 10.0;
            center
        })
        .collect();
    let points = gaussian_blobs(&centers, 50, 0.4, 99);

    let mut group = c.benchmark_group("hdbscan");
    for parallel in [false, true] {
        group.bench_function(if parallel { "parallel" } else { "serial" }, |b| {
            let options = HdbscanOptions {
                min_cluster_size: 4,
                min_samples: None,
                metric: DistanceMetric::Euclidean,
                parallel,
                approximate_knn: false,
            };
            let clusterer = Hdbscan::new(options);
            b.iter(|| clusterer.run(black_box(&points)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hdbscan);
criterion_main!(benches);
