//! Minimum spanning tree over mutual-reachability distances.
//!
//! Heap-based Prim starting from vertex 0. The mutual reachability
//! between i and j is `max(core[i], core[j], dist(i, j))`, computed on
//! the fly so the dense graph is never materialized beyond the heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use engram_core::config::DistanceMetric;

use super::distance;

/// An MST edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MstEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Min-heap entry; ties broken by lower endpoint index then by higher.
struct Frontier {
    weight: f64,
    lower: usize,
    higher: usize,
    /// The vertex this entry would add to the tree.
    vertex: usize,
    /// The in-tree vertex it connects from.
    from: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Frontier {}
impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for min-first ordering.
        other
            .weight
            .partial_cmp(&self.weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.lower.cmp(&self.lower))
            .then_with(|| other.higher.cmp(&self.higher))
    }
}

/// Build the MST of the mutual-reachability graph. Returns `n − 1`
/// edges (empty for `n < 2`).
pub fn mutual_reachability_mst(
    points: &[Vec<f32>],
    core_distances: &[f64],
    metric: DistanceMetric,
) -> Vec<MstEdge> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }

    let mreach = |i: usize, j: usize| -> f64 {
        let d = distance::distance(metric, &points[i], &points[j]);
        d.max(core_distances[i]).max(core_distances[j])
    };

    let mut in_tree = vec![false; n];
    let mut edges = Vec::with_capacity(n - 1);
    let mut heap = BinaryHeap::new();

    in_tree[0] = true;
    for v in 1..n {
        heap.push(Frontier {
            weight: mreach(0, v),
            lower: 0.min(v),
            higher: 0.max(v),
            vertex: v,
            from: 0,
        });
    }

    while edges.len() < n - 1 {
        let Some(entry) = heap.pop() else {
            break;
        };
        if in_tree[entry.vertex] {
            continue;
        }
        in_tree[entry.vertex] = true;
        edges.push(MstEdge {
            a: entry.from,
            b: entry.vertex,
            weight: entry.weight,
        });
        for v in 0..n {
            if !in_tree[v] {
                heap.push(Frontier {
                    weight: mreach(entry.vertex, v),
                    lower: entry.vertex.min(v),
                    higher: entry.vertex.max(v),
                    vertex: v,
                    from: entry.vertex,
                });
            }
        }
    }
    edges
}
