use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::VectorClock;

/// Edge orientation relative to conversational time.
///
/// `Forward` edges point earlier → later and are walked by predict;
/// recall walks their incoming side. `Backward` edges point
/// later → earlier and carry explicit back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Backward,
    Forward,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Backward => "backward",
            EdgeType::Forward => "forward",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "backward" => Some(EdgeType::Backward),
            "forward" => Some(EdgeType::Forward),
            _ => None,
        }
    }
}

/// Traversal direction for edge reads and chain walks.
///
/// `Backward` reconstructs history (recall); `Forward` follows likely
/// continuations (predict). The decay curve is selected by direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Backward,
    Forward,
}

/// Evidence class behind an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// Sequential chunks of the same session.
    Adjacent,
    /// Continuation across sessions in the same project.
    CrossSession,
    /// Parent chunk briefing a spawned sub-agent.
    SubagentBrief,
    /// Sub-agent reporting back to its parent.
    SubagentDebrief,
    /// Both chunks touch the same file path.
    SharedFile,
    /// Both chunks mention the same code entity.
    SharedEntity,
    /// Explicit textual back-reference.
    BackReference,
    /// Chunk carries an error fragment echoed later.
    ErrorFragment,
    /// Tool output consumed downstream.
    ToolOutput,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Adjacent => "adjacent",
            ReferenceType::CrossSession => "cross_session",
            ReferenceType::SubagentBrief => "subagent_brief",
            ReferenceType::SubagentDebrief => "subagent_debrief",
            ReferenceType::SharedFile => "shared_file",
            ReferenceType::SharedEntity => "shared_entity",
            ReferenceType::BackReference => "back_reference",
            ReferenceType::ErrorFragment => "error_fragment",
            ReferenceType::ToolOutput => "tool_output",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "adjacent" => Some(ReferenceType::Adjacent),
            "cross_session" => Some(ReferenceType::CrossSession),
            "subagent_brief" => Some(ReferenceType::SubagentBrief),
            "subagent_debrief" => Some(ReferenceType::SubagentDebrief),
            "shared_file" => Some(ReferenceType::SharedFile),
            "shared_entity" => Some(ReferenceType::SharedEntity),
            "back_reference" => Some(ReferenceType::BackReference),
            "error_fragment" => Some(ReferenceType::ErrorFragment),
            "tool_output" => Some(ReferenceType::ToolOutput),
            _ => None,
        }
    }
}

/// A directed, weighted connection between two chunks.
///
/// At most one edge exists per `(source, target, edge_type)`; re-asserting
/// the same edge bumps `link_count` and keeps the first-written weight,
/// reference type, and clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// UUID v4 identifier.
    pub id: String,
    pub source_chunk_id: String,
    pub target_chunk_id: String,
    pub edge_type: EdgeType,
    pub reference_type: Option<ReferenceType>,
    /// Weight at creation, in [0, 1].
    pub initial_weight: f64,
    pub created_at: DateTime<Utc>,
    /// Project clock observed at creation. Edges without a clock decay on
    /// wall-clock age instead of hops.
    pub vector_clock: Option<VectorClock>,
    /// Distinct ingest events that asserted this edge. Always ≥ 1.
    pub link_count: u32,
}

/// An edge paired with its decayed effective weight.
#[derive(Debug, Clone)]
pub struct WeightedEdge {
    pub edge: Edge,
    pub effective_weight: f64,
}

/// Outcome of a `create_or_boost_edges` batch: fresh inserts counted
/// separately from link-count boosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeUpsertStats {
    pub inserted: usize,
    pub boosted: usize,
}
