//! Structural edge detection.
//!
//! Every transition between chunks yields exactly one forward edge
//! (earlier → later) with uniform initial weight 1.0 and an evidence
//! class: plain adjacency within an agent, brief on descent into a
//! sub-agent, debrief on the way back, continuation across sessions.

use chrono::{DateTime, Utc};

use engram_core::clock::VectorClock;
use engram_core::models::{Chunk, Edge, EdgeType, ReferenceType};

/// Uniform weight of structural edges.
const STRUCTURAL_WEIGHT: f64 = 1.0;

pub fn forward_edge(
    source: &Chunk,
    target: &Chunk,
    reference: ReferenceType,
    clock: VectorClock,
    created_at: DateTime<Utc>,
) -> Edge {
    Edge {
        id: uuid::Uuid::new_v4().to_string(),
        source_chunk_id: source.id.clone(),
        target_chunk_id: target.id.clone(),
        edge_type: EdgeType::Forward,
        reference_type: Some(reference),
        initial_weight: STRUCTURAL_WEIGHT,
        created_at,
        vector_clock: Some(clock),
        link_count: 1,
    }
}

/// Evidence class of the transition from one chunk to the next within a
/// session.
pub fn classify_transition(from: &Chunk, to: &Chunk) -> ReferenceType {
    if to.spawn_depth > from.spawn_depth {
        ReferenceType::SubagentBrief
    } else if to.spawn_depth < from.spawn_depth {
        ReferenceType::SubagentDebrief
    } else if from.agent_id != to.agent_id {
        // Sibling hand-off at equal depth still crosses an agent
        // boundary; treat the outgoing side as a debrief.
        ReferenceType::SubagentDebrief
    } else {
        ReferenceType::Adjacent
    }
}

/// Detect all within-session transitions over chunks in session order.
/// The edge carries the clock of its later endpoint.
pub fn detect_session_edges(chunks: &[Chunk]) -> Vec<Edge> {
    let now = Utc::now();
    chunks
        .windows(2)
        .map(|pair| {
            let reference = classify_transition(&pair[0], &pair[1]);
            let clock = pair[1].vector_clock.clone().unwrap_or_default();
            forward_edge(&pair[0], &pair[1], reference, clock, now)
        })
        .collect()
}

/// Cross-session continuation: the project's latest prior chunk flows
/// into the new session's first chunk.
pub fn cross_session_edge(previous_tail: &Chunk, new_head: &Chunk) -> Edge {
    forward_edge(
        previous_tail,
        new_head,
        ReferenceType::CrossSession,
        new_head.vector_clock.clone().unwrap_or_default(),
        Utc::now(),
    )
}

/// Explicit back-reference: a later chunk pointing at the earlier one
/// it cites. The only transition stored as a `backward` edge; it decays
/// on the recall curve.
pub fn back_reference_edge(later: &Chunk, earlier: &Chunk) -> Edge {
    Edge {
        id: uuid::Uuid::new_v4().to_string(),
        source_chunk_id: later.id.clone(),
        target_chunk_id: earlier.id.clone(),
        edge_type: EdgeType::Backward,
        reference_type: Some(ReferenceType::BackReference),
        initial_weight: STRUCTURAL_WEIGHT,
        created_at: Utc::now(),
        vector_clock: Some(later.vector_clock.clone().unwrap_or_default()),
        link_count: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, agent: Option<&str>, depth: u32) -> Chunk {
        Chunk {
            id: id.to_string(),
            session_id: "s".into(),
            project_slug: "p".into(),
            turn_indices: vec![0],
            start_time: Utc::now(),
            end_time: Utc::now(),
            content: id.to_string(),
            code_block_count: 0,
            tool_use_count: 0,
            approx_tokens: 1,
            created_at: Utc::now(),
            agent_id: agent.map(String::from),
            vector_clock: Some(VectorClock::new()),
            spawn_depth: depth,
        }
    }

    #[test]
    fn adjacency_for_same_agent_chunks() {
        let chunks = vec![
            chunk("a", None, 0),
            chunk("b", None, 0),
            chunk("c", None, 0),
            chunk("d", None, 0),
        ];
        let edges = detect_session_edges(&chunks);
        assert_eq!(edges.len(), 3);
        for edge in &edges {
            assert_eq!(edge.reference_type, Some(ReferenceType::Adjacent));
            assert_eq!(edge.edge_type, EdgeType::Forward);
            assert_eq!(edge.initial_weight, 1.0);
        }
        assert_eq!(edges[0].source_chunk_id, "a");
        assert_eq!(edges[0].target_chunk_id, "b");
    }

    #[test]
    fn spawn_and_return_are_brief_and_debrief() {
        let chunks = vec![
            chunk("parent", None, 0),
            chunk("sub", Some("a1"), 1),
            chunk("resume", None, 0),
        ];
        let edges = detect_session_edges(&chunks);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].reference_type, Some(ReferenceType::SubagentBrief));
        assert_eq!(edges[0].source_chunk_id, "parent");
        assert_eq!(edges[0].target_chunk_id, "sub");
        assert_eq!(
            edges[1].reference_type,
            Some(ReferenceType::SubagentDebrief)
        );
        assert_eq!(edges[1].source_chunk_id, "sub");
        assert_eq!(edges[1].target_chunk_id, "resume");
    }

    #[test]
    fn back_reference_is_the_only_backward_edge() {
        let earlier = chunk("earlier", None, 0);
        let later = chunk("later", None, 0);
        let edge = back_reference_edge(&later, &earlier);
        assert_eq!(edge.edge_type, EdgeType::Backward);
        assert_eq!(edge.source_chunk_id, "later");
        assert_eq!(edge.target_chunk_id, "earlier");
        assert_eq!(edge.reference_type, Some(ReferenceType::BackReference));
    }

    #[test]
    fn cross_session_edge_points_old_to_new() {
        let old_tail = chunk("old", None, 0);
        let new_head = chunk("new", None, 0);
        let edge = cross_session_edge(&old_tail, &new_head);
        assert_eq!(edge.source_chunk_id, "old");
        assert_eq!(edge.target_chunk_id, "new");
        assert_eq!(edge.reference_type, Some(ReferenceType::CrossSession));
    }
}
