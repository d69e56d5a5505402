use serde::{Deserialize, Serialize};

use crate::constants;

/// Per-call ingestion options. Defaults mirror the engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Return a skipped result when the session is already ingested.
    pub skip_if_exists: bool,
    pub max_tokens_per_chunk: usize,
    pub min_tokens_per_chunk: usize,
    /// Render thinking blocks into chunk text.
    pub include_thinking: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            skip_if_exists: true,
            max_tokens_per_chunk: constants::DEFAULT_MAX_TOKENS_PER_CHUNK,
            min_tokens_per_chunk: constants::DEFAULT_MIN_TOKENS_PER_CHUNK,
            include_thinking: false,
        }
    }
}

/// Outcome of ingesting one session transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestResult {
    pub session_id: String,
    pub chunk_count: usize,
    pub edge_count: usize,
    pub cross_session_edges: usize,
    pub sub_agent_edges: usize,
    /// True when the session was already ingested and skipped.
    pub skipped: bool,
    pub duration_ms: u64,
}
