use engram_cluster::{Hdbscan, HdbscanOptions};
use engram_core::config::DistanceMetric;
use proptest::prelude::*;

fn arb_points() -> impl Strategy<Value = Vec<Vec<f32>>> {
    // Up to 40 points in 3-D, values in a modest range.
    proptest::collection::vec(
        proptest::collection::vec(-10.0f32..10.0, 3),
        0..40,
    )
}

fn options(min_cluster_size: usize, parallel: bool) -> HdbscanOptions {
    HdbscanOptions {
        min_cluster_size,
        min_samples: None,
        metric: DistanceMetric::Euclidean,
        parallel,
        approximate_knn: false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Labels are total: noise + member counts = n; noise points carry
    // probability 0 and outlier score 1.
    #[test]
    fn labels_are_total(points in arb_points(), mcs in 2usize..6) {
        let result = Hdbscan::new(options(mcs, false)).run(&points).unwrap();
        prop_assert_eq!(result.labels.len(), points.len());
        prop_assert_eq!(result.probabilities.len(), points.len());
        prop_assert_eq!(result.outlier_scores.len(), points.len());

        let clustered = result.labels.iter().filter(|&&l| l >= 0).count();
        prop_assert_eq!(clustered + result.noise_count, points.len());

        for i in 0..points.len() {
            let label = result.labels[i];
            if label < 0 {
                prop_assert_eq!(result.probabilities[i], 0.0);
                prop_assert_eq!(result.outlier_scores[i], 1.0);
            } else {
                prop_assert!((label as usize) < result.num_clusters);
                prop_assert!((0.0..=1.0).contains(&result.probabilities[i]));
                prop_assert!((0.0..=1.0).contains(&result.outlier_scores[i]));
            }
        }
    }

    // Parallelism must not change results.
    #[test]
    fn parallel_equals_serial(points in arb_points(), mcs in 2usize..5) {
        let serial = Hdbscan::new(options(mcs, false)).run(&points).unwrap();
        let parallel = Hdbscan::new(options(mcs, true)).run(&points).unwrap();
        prop_assert_eq!(serial.labels, parallel.labels);
        prop_assert_eq!(serial.noise_count, parallel.noise_count);
    }

    // Every cluster has at least min_cluster_size members.
    #[test]
    fn clusters_respect_min_size(points in arb_points(), mcs in 2usize..6) {
        let result = Hdbscan::new(options(mcs, false)).run(&points).unwrap();
        for cluster in 0..result.num_clusters {
            let size = result
                .labels
                .iter()
                .filter(|&&l| l == cluster as i32)
                .count();
            prop_assert!(
                size >= mcs,
                "cluster {} has {} members, below {}",
                cluster, size, mcs
            );
        }
    }
}
