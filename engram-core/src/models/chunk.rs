use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::VectorClock;

/// A contiguous slice of a session's rendered turns.
///
/// Chunks are immutable once ingested: content never changes, and the
/// project a chunk belongs to is fixed at creation. A chunk is deleted
/// only by orphan TTL cleanup after its last edge is pruned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// UUID v4 identifier.
    pub id: String,
    /// Session this chunk was cut from.
    pub session_id: String,
    /// Workspace slug, disambiguated across workspaces.
    pub project_slug: String,
    /// Turn indices covered, strictly increasing.
    pub turn_indices: Vec<u32>,
    /// Timestamp of the first covered turn.
    pub start_time: DateTime<Utc>,
    /// Timestamp of the last covered turn.
    pub end_time: DateTime<Utc>,
    /// Rendered text with structural markers.
    pub content: String,
    /// Fenced code blocks in the rendered text.
    pub code_block_count: u32,
    /// Tool invocations covered.
    pub tool_use_count: u32,
    /// Approximate token count of `content`.
    pub approx_tokens: u32,
    pub created_at: DateTime<Utc>,
    /// Producing agent: main UI, human, or a named sub-agent. None when
    /// the turn set spans agents.
    pub agent_id: Option<String>,
    /// Project clock observed at creation.
    pub vector_clock: Option<VectorClock>,
    /// 0 = main conversation; increments per nested sub-agent.
    pub spawn_depth: u32,
}

impl Chunk {
    /// Turn indices must be unique and monotonically increasing.
    pub fn turn_indices_valid(&self) -> bool {
        self.turn_indices.windows(2).all(|w| w[0] < w[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with_indices(indices: Vec<u32>) -> Chunk {
        Chunk {
            id: "c1".into(),
            session_id: "s1".into(),
            project_slug: "proj".into(),
            turn_indices: indices,
            start_time: Utc::now(),
            end_time: Utc::now(),
            content: String::new(),
            code_block_count: 0,
            tool_use_count: 0,
            approx_tokens: 0,
            created_at: Utc::now(),
            agent_id: None,
            vector_clock: None,
            spawn_depth: 0,
        }
    }

    #[test]
    fn strictly_increasing_indices_are_valid() {
        assert!(chunk_with_indices(vec![0, 1, 2]).turn_indices_valid());
        assert!(chunk_with_indices(vec![5]).turn_indices_valid());
        assert!(chunk_with_indices(vec![]).turn_indices_valid());
    }

    #[test]
    fn duplicate_or_unsorted_indices_are_invalid() {
        assert!(!chunk_with_indices(vec![1, 1]).turn_indices_valid());
        assert!(!chunk_with_indices(vec![2, 1]).turn_indices_valid());
    }
}
