//! Single-linkage dendrogram and condensed tree.
//!
//! MST edges sorted ascending merge components into a binary dendrogram.
//! The top-down condensation keeps a cluster alive while it loses
//! sub-threshold splinters (their points "fall out" at λ = 1/distance)
//! and records a real split only when both sides reach
//! `min_cluster_size`.

use super::mst::MstEdge;
use super::union_find::UnionFind;

/// λ floor guard: merges at distance 0 (duplicate points) map to a
/// large finite λ instead of infinity so stability sums stay finite.
const MIN_DISTANCE: f64 = 1e-12;

pub fn lambda_of(distance: f64) -> f64 {
    1.0 / distance.max(MIN_DISTANCE)
}

/// One internal node of the single-linkage dendrogram.
#[derive(Debug, Clone, Copy)]
pub struct DendrogramNode {
    /// Child ids: `< n` are points, `>= n` index `nodes` at `id − n`.
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

pub struct Dendrogram {
    pub n_points: usize,
    pub nodes: Vec<DendrogramNode>,
}

impl Dendrogram {
    /// Merge MST edges ascending into a binary tree. Ties sort by the
    /// lower endpoint, then the higher.
    pub fn build(n_points: usize, mst: &[MstEdge]) -> Self {
        let mut edges: Vec<MstEdge> = mst.to_vec();
        edges.sort_by(|x, y| {
            x.weight
                .partial_cmp(&y.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| x.a.min(x.b).cmp(&y.a.min(y.b)))
                .then_with(|| x.a.max(x.b).cmp(&y.a.max(y.b)))
        });

        let mut uf = UnionFind::new(n_points);
        // Dendrogram node id of each union-find root.
        let mut node_of_root: Vec<usize> = (0..n_points).collect();
        let mut size_of: Vec<usize> = vec![1; n_points];
        let mut nodes = Vec::with_capacity(n_points.saturating_sub(1));

        for edge in &edges {
            let ra = uf.find(edge.a);
            let rb = uf.find(edge.b);
            if ra == rb {
                continue;
            }
            let left = node_of_root[ra];
            let right = node_of_root[rb];
            let size = size_of[ra] + size_of[rb];
            let new_id = n_points + nodes.len();
            nodes.push(DendrogramNode {
                left,
                right,
                distance: edge.weight,
                size,
            });
            if let Some(root) = uf.union(ra, rb) {
                node_of_root[root] = new_id;
                size_of[root] = size;
            }
        }
        Self { n_points, nodes }
    }

    pub fn root(&self) -> Option<usize> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(self.n_points + self.nodes.len() - 1)
        }
    }

    pub fn size_of(&self, id: usize) -> usize {
        if id < self.n_points {
            1
        } else {
            self.nodes[id - self.n_points].size
        }
    }

    /// Leaf points under a node.
    pub fn collect_points(&self, id: usize, out: &mut Vec<usize>) {
        if id < self.n_points {
            out.push(id);
            return;
        }
        let node = self.nodes[id - self.n_points];
        self.collect_points(node.left, out);
        self.collect_points(node.right, out);
    }
}

/// One cluster of the condensed tree.
#[derive(Debug, Clone)]
pub struct CondensedCluster {
    pub parent: Option<usize>,
    pub lambda_birth: f64,
    /// λ at which this cluster split into `children`.
    pub lambda_split: Option<f64>,
    pub children: Vec<usize>,
    /// Points that left this cluster without entering a child, with the
    /// λ at which they fell out.
    pub fallout: Vec<(usize, f64)>,
    /// Points that ever entered this cluster.
    pub size: usize,
}

pub struct CondensedTree {
    pub clusters: Vec<CondensedCluster>,
}

impl CondensedTree {
    /// Condense the dendrogram top-down.
    pub fn build(dendrogram: &Dendrogram, min_cluster_size: usize) -> Self {
        let mut clusters = Vec::new();
        let Some(root) = dendrogram.root() else {
            return Self { clusters };
        };

        clusters.push(CondensedCluster {
            parent: None,
            lambda_birth: 0.0,
            lambda_split: None,
            children: Vec::new(),
            fallout: Vec::new(),
            size: dendrogram.size_of(root),
        });

        // (dendrogram node, condensed cluster it currently extends)
        let mut stack = vec![(root, 0usize)];
        while let Some((node_id, cluster_id)) = stack.pop() {
            let node = dendrogram.nodes[node_id - dendrogram.n_points];
            let lambda = lambda_of(node.distance);
            let left_size = dendrogram.size_of(node.left);
            let right_size = dendrogram.size_of(node.right);

            if left_size >= min_cluster_size && right_size >= min_cluster_size {
                // Real split: both sides stand on their own.
                clusters[cluster_id].lambda_split = Some(lambda);
                for &(child, child_size) in
                    &[(node.left, left_size), (node.right, right_size)]
                {
                    let child_cluster = clusters.len();
                    clusters.push(CondensedCluster {
                        parent: Some(cluster_id),
                        lambda_birth: lambda,
                        lambda_split: None,
                        children: Vec::new(),
                        fallout: Vec::new(),
                        size: child_size,
                    });
                    clusters[cluster_id].children.push(child_cluster);
                    stack.push((child, child_cluster));
                }
            } else {
                // Splinters fall out; a surviving side extends the
                // cluster.
                for &(child, child_size) in
                    &[(node.left, left_size), (node.right, right_size)]
                {
                    if child_size >= min_cluster_size {
                        stack.push((child, cluster_id));
                    } else {
                        let mut points = Vec::with_capacity(child_size);
                        dendrogram.collect_points(child, &mut points);
                        for p in points {
                            clusters[cluster_id].fallout.push((p, lambda));
                        }
                    }
                }
            }
        }
        Self { clusters }
    }

    /// Stability `S(C) = Σ_points (λ_leave − λ_birth)`: fallout points
    /// leave at their own λ, child-bound points at the split λ.
    pub fn stability(&self, cluster_id: usize) -> f64 {
        let cluster = &self.clusters[cluster_id];
        let mut s: f64 = cluster
            .fallout
            .iter()
            .map(|(_, l)| l - cluster.lambda_birth)
            .sum();
        if let Some(split) = cluster.lambda_split {
            for &child in &cluster.children {
                s += self.clusters[child].size as f64 * (split - cluster.lambda_birth);
            }
        }
        s
    }

    /// All `(point, fallout λ)` pairs in the subtree of a cluster. Each
    /// point appears exactly once across the whole tree.
    pub fn subtree_points(&self, cluster_id: usize) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        let mut stack = vec![cluster_id];
        while let Some(id) = stack.pop() {
            out.extend(self.clusters[id].fallout.iter().copied());
            stack.extend(self.clusters[id].children.iter().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::config::DistanceMetric;

    use crate::hdbscan::mst::mutual_reachability_mst;

    /// Two tight pairs of points far apart, plus one straggler.
    fn two_groups() -> Vec<Vec<f32>> {
        vec![
            vec![0.0],
            vec![0.1],
            vec![0.2],
            vec![10.0],
            vec![10.1],
            vec![10.2],
            vec![100.0],
        ]
    }

    #[test]
    fn dendrogram_has_n_minus_one_merges() {
        let points = two_groups();
        let mst = mutual_reachability_mst(&points, &[0.0; 7], DistanceMetric::Euclidean);
        let dendrogram = Dendrogram::build(points.len(), &mst);
        assert_eq!(dendrogram.nodes.len(), 6);
        assert_eq!(dendrogram.size_of(dendrogram.root().unwrap()), 7);
    }

    #[test]
    fn condensation_splits_the_two_groups() {
        let points = two_groups();
        let mst = mutual_reachability_mst(&points, &[0.0; 7], DistanceMetric::Euclidean);
        let dendrogram = Dendrogram::build(points.len(), &mst);
        let tree = CondensedTree::build(&dendrogram, 3);

        // Root plus two real children; the straggler fell out of root.
        assert_eq!(tree.clusters.len(), 3);
        assert_eq!(tree.clusters[0].children.len(), 2);
        assert_eq!(tree.clusters[0].fallout.len(), 1);
        assert_eq!(tree.clusters[0].fallout[0].0, 6);

        // Every point accounted for exactly once.
        let mut all = tree.subtree_points(0);
        all.sort_by_key(|(p, _)| *p);
        let ids: Vec<usize> = all.iter().map(|(p, _)| *p).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn stability_prefers_tight_children() {
        let points = two_groups();
        let mst = mutual_reachability_mst(&points, &[0.0; 7], DistanceMetric::Euclidean);
        let dendrogram = Dendrogram::build(points.len(), &mst);
        let tree = CondensedTree::build(&dendrogram, 3);
        let children_sum: f64 = tree.clusters[0]
            .children
            .iter()
            .map(|&c| tree.stability(c))
            .sum();
        assert!(children_sum > tree.stability(0));
    }
}
