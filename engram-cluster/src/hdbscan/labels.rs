//! Final labeling: cluster membership, probabilities, GLOSH outlier
//! scores, exemplars.

use engram_core::codec::normalize;

use super::condense::CondensedTree;
use super::distance::angular;

pub struct Labeling {
    /// Cluster label per point; −1 is noise.
    pub labels: Vec<i32>,
    /// Membership strength in [0, 1]; 0 for noise.
    pub probabilities: Vec<f64>,
    /// GLOSH outlier score in [0, 1]; 1 for noise.
    pub outlier_scores: Vec<f64>,
    /// Per cluster: member indices closest to the cluster centroid.
    pub exemplars: Vec<Vec<usize>>,
}

/// Label every point from the selected condensed clusters.
///
/// Cluster numbering follows ascending condensed-cluster id, so labels
/// are stable for fixed input. Points outside every selected cluster
/// are noise with probability 0 and outlier score 1.
pub fn label_points(
    tree: &CondensedTree,
    selected: &[usize],
    points: &[Vec<f32>],
    exemplar_count: usize,
) -> Labeling {
    let n = points.len();
    let mut labels = vec![-1i32; n];
    let mut probabilities = vec![0.0f64; n];
    let mut outlier_scores = vec![1.0f64; n];
    let mut exemplars = Vec::with_capacity(selected.len());

    for (cluster_label, &cluster_id) in selected.iter().enumerate() {
        let members = tree.subtree_points(cluster_id);
        let lambda_birth = tree.clusters[cluster_id].lambda_birth;
        let lambda_max = members
            .iter()
            .map(|(_, l)| *l)
            .fold(f64::NEG_INFINITY, f64::max);

        for &(point, lambda_point) in &members {
            labels[point] = cluster_label as i32;
            let span = lambda_max - lambda_birth;
            probabilities[point] = if span > 0.0 {
                ((lambda_point - lambda_birth) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            outlier_scores[point] = if lambda_max > 0.0 {
                (1.0 - lambda_point / lambda_max).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        exemplars.push(pick_exemplars(&members, points, exemplar_count));
    }

    Labeling {
        labels,
        probabilities,
        outlier_scores,
        exemplars,
    }
}

/// Members closest to the normalized centroid by angular distance, ties
/// broken by lower index.
fn pick_exemplars(
    members: &[(usize, f64)],
    points: &[Vec<f32>],
    count: usize,
) -> Vec<usize> {
    let Some(dim) = points.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut centroid = vec![0.0f32; dim];
    for &(point, _) in members {
        for (slot, value) in centroid.iter_mut().zip(points[point].iter()) {
            *slot += value;
        }
    }
    let scale = 1.0 / members.len().max(1) as f32;
    for slot in centroid.iter_mut() {
        *slot *= scale;
    }
    normalize(&mut centroid);

    let mut ranked: Vec<(usize, f64)> = members
        .iter()
        .map(|&(point, _)| (point, angular(&points[point], &centroid)))
        .collect();
    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(count);
    ranked.into_iter().map(|(point, _)| point).collect()
}
