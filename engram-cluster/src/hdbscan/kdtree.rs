//! kd-tree k-nearest-neighbour index over Euclidean space.
//!
//! Built once per clustering run by recursive median split. Queries
//! keep a bounded worst-candidate heap and prune subtrees on the
//! splitting-plane distance. Average O(dim·log n) per query on
//! embedding-like distributions.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::distance::euclidean;

struct Node {
    /// Index into the point set.
    point: usize,
    axis: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

pub struct KdTree<'a> {
    points: &'a [Vec<f32>],
    root: Option<Box<Node>>,
}

/// Max-heap entry: worst candidate on top.
struct Candidate {
    distance: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.index == other.index
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl<'a> KdTree<'a> {
    pub fn build(points: &'a [Vec<f32>]) -> Self {
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let root = Self::build_node(points, &mut indices, 0);
        Self { points, root }
    }

    fn build_node(points: &[Vec<f32>], indices: &mut [usize], depth: usize) -> Option<Box<Node>> {
        if indices.is_empty() {
            return None;
        }
        let dim = points[indices[0]].len().max(1);
        let axis = depth % dim;
        indices.sort_by(|&a, &b| {
            points[a][axis]
                .partial_cmp(&points[b][axis])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
        let median = indices.len() / 2;
        let point = indices[median];
        let (left, rest) = indices.split_at_mut(median);
        let right = &mut rest[1..];
        Some(Box::new(Node {
            point,
            axis,
            left: Self::build_node(points, left, depth + 1),
            right: Self::build_node(points, right, depth + 1),
        }))
    }

    /// The `k` nearest neighbours of `query` (excluding `exclude`,
    /// typically the query point itself), as `(index, distance)` sorted
    /// nearest-first.
    pub fn knn(&self, query: &[f32], k: usize, exclude: Option<usize>) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
        Self::search(self.points, &self.root, query, k, exclude, &mut heap);
        let mut out: Vec<(usize, f64)> = heap
            .into_iter()
            .map(|c| (c.index, c.distance))
            .collect();
        out.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    fn search(
        points: &[Vec<f32>],
        node: &Option<Box<Node>>,
        query: &[f32],
        k: usize,
        exclude: Option<usize>,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let Some(node) = node else {
            return;
        };

        if Some(node.point) != exclude {
            let d = euclidean(query, &points[node.point]);
            if heap.len() < k {
                heap.push(Candidate {
                    distance: d,
                    index: node.point,
                });
            } else if let Some(worst) = heap.peek() {
                if d < worst.distance {
                    heap.pop();
                    heap.push(Candidate {
                        distance: d,
                        index: node.point,
                    });
                }
            }
        }

        let axis = node.axis;
        let diff = query[axis] as f64 - points[node.point][axis] as f64;
        let (near, far) = if diff <= 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };

        Self::search(points, near, query, k, exclude, heap);

        // Visit the far side only if the splitting plane is closer than
        // the current worst candidate.
        let worst = heap.peek().map(|c| c.distance).unwrap_or(f64::INFINITY);
        if heap.len() < k || diff.abs() < worst {
            Self::search(points, far, query, k, exclude, heap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_knn(
        points: &[Vec<f32>],
        query: &[f32],
        k: usize,
        exclude: Option<usize>,
    ) -> Vec<(usize, f64)> {
        let mut all: Vec<(usize, f64)> = points
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .map(|(i, p)| (i, euclidean(query, p)))
            .collect();
        all.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap()
                .then_with(|| a.0.cmp(&b.0))
        });
        all.truncate(k);
        all
    }

    #[test]
    fn agrees_with_brute_force() {
        let mut state = 12345u64;
        let points: Vec<Vec<f32>> = (0..80)
            .map(|_| {
                (0..4)
                    .map(|_| {
                        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                        ((state >> 40) as f32 / (1u64 << 24) as f32) * 10.0
                    })
                    .collect()
            })
            .collect();
        let tree = KdTree::build(&points);
        for i in [0usize, 13, 79] {
            let from_tree = tree.knn(&points[i], 5, Some(i));
            let from_brute = brute_knn(&points, &points[i], 5, Some(i));
            let tree_dists: Vec<f64> = from_tree.iter().map(|x| x.1).collect();
            let brute_dists: Vec<f64> = from_brute.iter().map(|x| x.1).collect();
            for (a, b) in tree_dists.iter().zip(brute_dists.iter()) {
                assert!((a - b).abs() < 1e-9, "distance mismatch: {a} vs {b}");
            }
        }
    }

    #[test]
    fn excludes_the_query_point() {
        let points = vec![vec![0.0f32], vec![1.0], vec![2.0]];
        let tree = KdTree::build(&points);
        let hits = tree.knn(&points[0], 2, Some(0));
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2]);
    }
}
