use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A density-based grouping of chunks.
///
/// Name and description are filled out-of-band by the label refresh task.
/// `membership_hash` covers the current assigned member set; a mismatch
/// against the recomputed hash marks the cluster stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// UUID v4 identifier.
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Unit-normalized mean of member vectors.
    pub centroid: Option<Vec<f32>>,
    /// Member ids closest to the centroid, nearest first.
    pub exemplar_ids: Vec<String>,
    /// blake3 of the sorted member id list.
    pub membership_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Last out-of-band label refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Soft assignment of a chunk to a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub chunk_id: String,
    pub cluster_id: String,
    /// Angular distance from the chunk vector to the cluster centroid.
    pub distance: f64,
}

/// Summary of a recluster run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReclusterResult {
    pub num_clusters: usize,
    pub assigned_chunks: usize,
    /// Points that were noise in the previous run and found a cluster now.
    pub reassigned_noise: usize,
}
