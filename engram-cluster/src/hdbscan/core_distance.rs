//! Core distances: each point's distance to its k-th nearest neighbour.
//!
//! Brute-force back-end scans all pairs with quickselect for the k-th
//! statistic; the kd-tree back-end answers k-NN queries instead. When
//! `parallel` is on, index ranges are partitioned across the rayon
//! pool; results are written by index, so worker scheduling cannot
//! change the output.

use rayon::prelude::*;

use engram_core::config::DistanceMetric;

use super::distance::{self, euclidean_to_angular};
use super::kdtree::KdTree;
use super::quickselect::kth_smallest;

/// How many indices one worker takes at a time.
const PARTITION_SIZE: usize = 64;

pub struct CoreDistanceJob<'a> {
    pub points: &'a [Vec<f32>],
    pub k: usize,
    pub metric: DistanceMetric,
    pub parallel: bool,
    pub use_index: bool,
}

/// Compute all core distances for the job.
pub fn compute(job: &CoreDistanceJob<'_>) -> Vec<f64> {
    let n = job.points.len();
    if n <= 1 {
        return vec![0.0; n];
    }

    if job.use_index {
        let tree = KdTree::build(job.points);
        let per_point = |i: usize| -> f64 {
            let hits = tree.knn(&job.points[i], job.k, Some(i));
            let worst = hits.last().map(|h| h.1).unwrap_or(0.0);
            match job.metric {
                DistanceMetric::Euclidean => worst,
                DistanceMetric::Angular => euclidean_to_angular(worst),
            }
        };
        run_partitioned(n, job.parallel, per_point)
    } else {
        let per_point = |i: usize| -> f64 {
            let mut dists: Vec<f64> = (0..n)
                .filter(|&j| j != i)
                .map(|j| distance::distance(job.metric, &job.points[i], &job.points[j]))
                .collect();
            kth_smallest(&mut dists, job.k)
        };
        run_partitioned(n, job.parallel, per_point)
    }
}

fn run_partitioned<F>(n: usize, parallel: bool, per_point: F) -> Vec<f64>
where
    F: Fn(usize) -> f64 + Sync,
{
    if parallel {
        let mut out = vec![0.0; n];
        out.par_chunks_mut(PARTITION_SIZE)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let base = chunk_idx * PARTITION_SIZE;
                for (offset, slot) in chunk.iter_mut().enumerate() {
                    *slot = per_point(base + offset);
                }
            });
        out
    } else {
        (0..n).map(per_point).collect()
    }
}
