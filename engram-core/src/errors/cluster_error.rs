/// Clustering errors.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("clustering failed: {reason}")]
    ClusterFailed { reason: String },

    #[error("no vectors available to cluster")]
    NoVectors,

    #[error("centroid computation failed for cluster {cluster_id}: {reason}")]
    CentroidFailed { cluster_id: String, reason: String },
}

impl ClusterError {
    pub fn code(&self) -> &'static str {
        match self {
            ClusterError::ClusterFailed { .. } => "CLUSTER_FAILED",
            ClusterError::NoVectors => "NO_VECTORS",
            ClusterError::CentroidFailed { .. } => "CENTROID_FAILED",
        }
    }
}
