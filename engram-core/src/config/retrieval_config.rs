use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{ConfigError, EngramResult};

/// Retrieval subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF weight of the vector list.
    pub vector_weight: f64,
    /// RRF weight of the keyword list.
    pub keyword_weight: f64,
    /// RRF smoothing constant.
    pub rrf_k: u32,
    /// Candidates fetched from vector search.
    pub vector_top_n: usize,
    /// Candidates fetched from keyword search.
    pub keyword_top_m: usize,
    /// Distinct clusters consulted during expansion.
    pub max_clusters: usize,
    /// Sibling chunks pulled in per cluster.
    pub max_siblings: usize,
    /// MMR relevance/diversity trade-off, in [0, 1].
    pub mmr_lambda: f64,
    pub recency_decay_factor: f64,
    pub recency_half_life_hours: f64,
    /// Seeds handed to the chain walker.
    pub seed_count: usize,
    /// Maximum hops per chain walk.
    pub max_walk_depth: usize,
    /// Consecutive agent-filtered skips before a chain is abandoned.
    pub max_skipped_consecutive: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_weight: constants::DEFAULT_VECTOR_WEIGHT,
            keyword_weight: constants::DEFAULT_KEYWORD_WEIGHT,
            rrf_k: constants::DEFAULT_RRF_K,
            vector_top_n: constants::DEFAULT_VECTOR_TOP_N,
            keyword_top_m: constants::DEFAULT_KEYWORD_TOP_M,
            max_clusters: constants::DEFAULT_MAX_CLUSTERS,
            max_siblings: constants::DEFAULT_MAX_SIBLINGS,
            mmr_lambda: constants::DEFAULT_MMR_LAMBDA,
            recency_decay_factor: constants::DEFAULT_RECENCY_DECAY_FACTOR,
            recency_half_life_hours: constants::DEFAULT_RECENCY_HALF_LIFE_HOURS,
            seed_count: constants::DEFAULT_SEED_COUNT,
            max_walk_depth: constants::DEFAULT_MAX_WALK_DEPTH,
            max_skipped_consecutive: constants::DEFAULT_MAX_SKIPPED_CONSECUTIVE,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> EngramResult<()> {
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.mmr_lambda".into(),
                reason: "must be in [0, 1]".into(),
            }
            .into());
        }
        if self.vector_weight < 0.0 || self.keyword_weight < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.vector_weight".into(),
                reason: "fusion weights must be non-negative".into(),
            }
            .into());
        }
        if self.recency_half_life_hours <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.recency_half_life_hours".into(),
                reason: "must be positive".into(),
            }
            .into());
        }
        Ok(())
    }
}
