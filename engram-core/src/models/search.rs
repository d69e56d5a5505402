use serde::{Deserialize, Serialize};

use crate::models::chunk::Chunk;
use crate::models::edge::Direction;

/// Which retrieval stage contributed an item. `Graph` is reserved: no
/// shipped stage assigns it, but expansion results may carry it in the
/// future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Vector,
    Keyword,
    Cluster,
    Graph,
}

/// Project and agent restriction applied to search back-ends.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Project slugs to search; empty means all projects.
    pub projects: Vec<String>,
    /// Restrict to chunks produced by this agent.
    pub agent_id: Option<String>,
}

impl SearchFilter {
    pub fn for_project(slug: &str) -> Self {
        Self {
            projects: vec![slug.to_string()],
            agent_id: None,
        }
    }
}

/// A hybrid search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub project_filter: Option<String>,
    pub agent_filter: Option<String>,
    /// The caller's current session; its chunks get a boost.
    pub session_id: Option<String>,
    pub token_budget: usize,
    /// Skip cluster expansion.
    pub skip_clusters: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            project_filter: None,
            agent_filter: None,
            session_id: None,
            token_budget: crate::constants::DEFAULT_TOKEN_BUDGET,
            skip_clusters: false,
        }
    }
}

/// A chunk with its pipeline score and contributing source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
    pub source: SearchSource,
}

/// Assembled search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Budget-bounded context text with per-chunk headers.
    pub text: String,
    pub token_count: usize,
    pub chunks: Vec<ScoredChunk>,
    /// Candidates examined before budget assembly.
    pub total_considered: usize,
    pub duration_ms: u64,
    pub query_embedding: Vec<f32>,
    /// Top ids handed to the chain walker.
    pub seed_ids: Vec<String>,
}

/// Episodic retrieval request (recall or predict).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicRequest {
    pub query: String,
    pub project_filter: Option<String>,
    pub agent_filter: Option<String>,
    pub session_id: Option<String>,
    pub token_budget: usize,
}

impl EpisodicRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            project_filter: None,
            agent_filter: None,
            session_id: None,
            token_budget: crate::constants::DEFAULT_TOKEN_BUDGET,
        }
    }
}

/// How an episodic response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EpisodicMode {
    /// A chain of length ≥ 2 was reconstructed.
    Chain,
    /// No chain qualified; the hybrid search result was returned instead.
    SearchFallback,
}

/// Episodic retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicResponse {
    pub text: String,
    pub token_count: usize,
    pub mode: EpisodicMode,
    pub direction: Direction,
    /// Chunk ids in narrative order.
    pub chunk_ids: Vec<String>,
    pub duration_ms: u64,
}
