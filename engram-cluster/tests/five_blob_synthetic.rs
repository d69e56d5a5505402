//! Synthetic benchmark scenario: five well-separated Gaussian blobs in
//! 128-D plus uniform noise.

use engram_cluster::{Hdbscan, HdbscanOptions};
use engram_core::config::DistanceMetric;
use test_fixtures::{gaussian_blobs, uniform_noise};

const DIM: usize = 128;
const SIGMA: f32 = 0.5;

fn blob_centers() -> Vec<Vec<f32>> {
    // Five centers far apart along distinct axes.
    (0..5)
        .map(|b| {
            let mut center = vec![0.0f32; DIM];
            center[b * 20] = 20.0;
            center[b * 20 + 7] = -15.0;
            center
        })
        .collect()
}

#[test]
fn five_blobs_plus_noise() {
    let centers = blob_centers();
    let mut points = gaussian_blobs(&centers, 200, SIGMA, 1234);
    points.extend(uniform_noise(100, DIM, -30.0, 30.0, 5678));
    assert_eq!(points.len(), 1100);

    let options = HdbscanOptions {
        min_cluster_size: 4,
        min_samples: None,
        metric: DistanceMetric::Euclidean,
        parallel: true,
        approximate_knn: false,
    };
    let result = Hdbscan::new(options).run(&points).unwrap();

    assert_eq!(result.num_clusters, 5, "expected exactly five blobs");

    let noise_ratio = result.noise_count as f64 / points.len() as f64;
    assert!(
        (0.05..=0.20).contains(&noise_ratio),
        "noise ratio {noise_ratio} out of expected band"
    );

    // Blob members share a label; the dominant label per blob is unique.
    let mut dominant = Vec::new();
    for blob in 0..5 {
        let slice = &result.labels[blob * 200..(blob + 1) * 200];
        let mut counts = std::collections::HashMap::new();
        for &label in slice.iter().filter(|&&l| l >= 0) {
            *counts.entry(label).or_insert(0usize) += 1;
        }
        let (&label, &count) = counts.iter().max_by_key(|(_, &c)| c).unwrap();
        assert!(count > 180, "blob {blob} scattered: {count}/200");
        dominant.push(label);
    }
    dominant.sort_unstable();
    dominant.dedup();
    assert_eq!(dominant.len(), 5, "blobs must map to distinct clusters");

    // Exemplars sit near their own blob's center: closer to it than to
    // any other center, and within the blob's typical radius.
    let typical_radius = SIGMA * (DIM as f32).sqrt() * 1.5;
    for exemplars in &result.exemplars {
        assert!(!exemplars.is_empty());
        for &point_index in exemplars {
            let point = &points[point_index];
            let mut distances: Vec<f32> = centers
                .iter()
                .map(|c| {
                    c.iter()
                        .zip(point.iter())
                        .map(|(a, b)| (a - b).powi(2))
                        .sum::<f32>()
                        .sqrt()
                })
                .collect();
            let own = point_index / 200;
            assert!(own < 5, "exemplar {point_index} is a noise point");
            let own_distance = distances[own];
            distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(own_distance, distances[0], "exemplar nearest a foreign blob");
            assert!(
                own_distance <= typical_radius,
                "exemplar {own_distance} beyond typical radius {typical_radius}"
            );
        }
    }
}
