//! HDBSCAN over unit-norm embedding vectors.
//!
//! Stages: core distances (parallel, brute force or kd-tree), mutual
//! reachability MST (Prim), single-linkage dendrogram, condensed tree,
//! stability selection, labeling. With fixed inputs the documented
//! tie-breaks make the output stable modulo cluster renumbering;
//! parallelism only changes timing.

pub mod condense;
pub mod core_distance;
pub mod distance;
pub mod kdtree;
pub mod labels;
pub mod mst;
pub mod quickselect;
pub mod stability;
pub mod union_find;

use engram_core::config::{ClusterConfig, DistanceMetric};
use engram_core::constants::CLUSTER_EXEMPLAR_COUNT;
use engram_core::errors::{ClusterError, EngramResult};

use condense::{CondensedTree, Dendrogram};
use core_distance::CoreDistanceJob;

/// Clustering options. `min_samples` falls back to `min_cluster_size`.
#[derive(Debug, Clone)]
pub struct HdbscanOptions {
    pub min_cluster_size: usize,
    pub min_samples: Option<usize>,
    pub metric: DistanceMetric,
    pub parallel: bool,
    pub approximate_knn: bool,
}

impl Default for HdbscanOptions {
    fn default() -> Self {
        Self {
            min_cluster_size: engram_core::constants::DEFAULT_MIN_CLUSTER_SIZE,
            min_samples: None,
            metric: DistanceMetric::Angular,
            parallel: true,
            approximate_knn: false,
        }
    }
}

impl From<&ClusterConfig> for HdbscanOptions {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            min_cluster_size: config.min_cluster_size,
            min_samples: config.min_samples,
            metric: config.metric,
            parallel: config.parallel,
            approximate_knn: config.approximate_knn,
        }
    }
}

/// Clustering output. Labels are total: every input index gets a label,
/// −1 meaning noise.
#[derive(Debug, Clone)]
pub struct HdbscanResult {
    pub labels: Vec<i32>,
    pub num_clusters: usize,
    pub noise_count: usize,
    pub probabilities: Vec<f64>,
    pub outlier_scores: Vec<f64>,
    /// Per cluster: member indices closest to the cluster centroid.
    pub exemplars: Vec<Vec<usize>>,
}

impl HdbscanResult {
    fn all_noise(n: usize) -> Self {
        Self {
            labels: vec![-1; n],
            num_clusters: 0,
            noise_count: n,
            probabilities: vec![0.0; n],
            outlier_scores: vec![1.0; n],
            exemplars: Vec::new(),
        }
    }
}

/// The clusterer.
pub struct Hdbscan {
    options: HdbscanOptions,
}

impl Hdbscan {
    pub fn new(options: HdbscanOptions) -> Self {
        Self { options }
    }

    /// Cluster the given points. All points must share one dimension.
    pub fn run(&self, points: &[Vec<f32>]) -> EngramResult<HdbscanResult> {
        let n = points.len();
        if n == 0 {
            return Ok(HdbscanResult::all_noise(0));
        }
        let dim = points[0].len();
        if points.iter().any(|p| p.len() != dim) {
            return Err(ClusterError::ClusterFailed {
                reason: "input vectors have mixed dimensions".into(),
            }
            .into());
        }
        // Sub-2 cluster sizes degenerate to singletons; clamp.
        let min_cluster_size = self.options.min_cluster_size.max(2);
        if n < min_cluster_size {
            return Ok(HdbscanResult::all_noise(n));
        }

        let k = self
            .options
            .min_samples
            .unwrap_or(min_cluster_size)
            .max(1);

        let core_distances = core_distance::compute(&CoreDistanceJob {
            points,
            k,
            metric: self.options.metric,
            parallel: self.options.parallel,
            use_index: self.options.approximate_knn,
        });

        let mst = mst::mutual_reachability_mst(points, &core_distances, self.options.metric);
        let dendrogram = Dendrogram::build(n, &mst);
        let tree = CondensedTree::build(&dendrogram, min_cluster_size);
        let selected = stability::select_clusters(&tree);
        let labeling = labels::label_points(&tree, &selected, points, CLUSTER_EXEMPLAR_COUNT);

        let noise_count = labeling.labels.iter().filter(|&&l| l < 0).count();
        tracing::debug!(
            points = n,
            clusters = selected.len(),
            noise = noise_count,
            "hdbscan complete"
        );
        Ok(HdbscanResult {
            num_clusters: selected.len(),
            noise_count,
            labels: labeling.labels,
            probabilities: labeling.probabilities,
            outlier_scores: labeling.outlier_scores,
            exemplars: labeling.exemplars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_output() {
        let result = Hdbscan::new(HdbscanOptions::default()).run(&[]).unwrap();
        assert_eq!(result.num_clusters, 0);
        assert!(result.labels.is_empty());
    }

    #[test]
    fn too_few_points_are_all_noise() {
        let points = vec![vec![1.0f32], vec![2.0]];
        let options = HdbscanOptions {
            min_cluster_size: 4,
            metric: DistanceMetric::Euclidean,
            ..Default::default()
        };
        let result = Hdbscan::new(options).run(&points).unwrap();
        assert_eq!(result.labels, vec![-1, -1]);
        assert_eq!(result.noise_count, 2);
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let points = vec![vec![1.0f32, 2.0], vec![1.0]];
        let result = Hdbscan::new(HdbscanOptions::default()).run(&points);
        assert_eq!(result.unwrap_err().code(), "CLUSTER_FAILED");
    }

    #[test]
    fn separates_two_obvious_groups() {
        let mut points = Vec::new();
        for i in 0..6 {
            points.push(vec![i as f32 * 0.01, 0.0]);
        }
        for i in 0..6 {
            points.push(vec![5.0 + i as f32 * 0.01, 5.0]);
        }
        let options = HdbscanOptions {
            min_cluster_size: 3,
            metric: DistanceMetric::Euclidean,
            parallel: false,
            ..Default::default()
        };
        let result = Hdbscan::new(options).run(&points).unwrap();
        assert_eq!(result.num_clusters, 2);
        // The two halves carry distinct labels.
        assert_eq!(result.labels[0], result.labels[5]);
        assert_eq!(result.labels[6], result.labels[11]);
        assert_ne!(result.labels[0], result.labels[6]);
    }

    #[test]
    fn label_totality_invariant() {
        let points: Vec<Vec<f32>> = (0..30)
            .map(|i| vec![(i % 3) as f32 * 8.0 + (i as f32 * 0.013), 1.0])
            .collect();
        let options = HdbscanOptions {
            min_cluster_size: 4,
            metric: DistanceMetric::Euclidean,
            parallel: false,
            ..Default::default()
        };
        let result = Hdbscan::new(options).run(&points).unwrap();
        assert_eq!(result.labels.len(), points.len());
        let clustered: usize = result.labels.iter().filter(|&&l| l >= 0).count();
        assert_eq!(clustered + result.noise_count, points.len());
        for (i, &label) in result.labels.iter().enumerate() {
            if label < 0 {
                assert_eq!(result.probabilities[i], 0.0);
                assert_eq!(result.outlier_scores[i], 1.0);
            } else {
                assert!((label as usize) < result.num_clusters);
            }
        }
    }
}
