use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{ConfigError, EngramResult};

/// Distance metric for clustering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Euclidean,
    /// `1 − u·v` on unit vectors.
    #[default]
    Angular,
}

/// Clustering subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub min_cluster_size: usize,
    /// Defaults to `min_cluster_size` when absent.
    pub min_samples: Option<usize>,
    pub metric: DistanceMetric,
    /// Partition core-distance work across the worker pool.
    pub parallel: bool,
    /// Use the spatial index instead of brute-force neighbour scans.
    pub approximate_knn: bool,
    /// Hours before a cluster's labels count as stale.
    pub stale_hours: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: constants::DEFAULT_MIN_CLUSTER_SIZE,
            min_samples: None,
            metric: DistanceMetric::default(),
            parallel: true,
            approximate_knn: false,
            stale_hours: constants::DEFAULT_CLUSTER_STALE_HOURS,
        }
    }
}

impl ClusterConfig {
    /// Effective `min_samples`: explicit value or `min_cluster_size`.
    pub fn effective_min_samples(&self) -> usize {
        self.min_samples.unwrap_or(self.min_cluster_size)
    }

    pub fn validate(&self) -> EngramResult<()> {
        if self.min_cluster_size < 2 {
            return Err(ConfigError::InvalidValue {
                field: "cluster.min_cluster_size".into(),
                reason: "must be at least 2".into(),
            }
            .into());
        }
        if self.min_samples == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "cluster.min_samples".into(),
                reason: "must be at least 1".into(),
            }
            .into());
        }
        Ok(())
    }
}
