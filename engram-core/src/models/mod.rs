//! Persistent and wire-level domain models.

pub mod chunk;
pub mod cluster;
pub mod edge;
pub mod ingest;
pub mod prune;
pub mod search;
pub mod session;

pub use chunk::Chunk;
pub use cluster::{Cluster, ClusterAssignment, ReclusterResult};
pub use edge::{Direction, Edge, EdgeType, EdgeUpsertStats, ReferenceType, WeightedEdge};
pub use ingest::{IngestOptions, IngestResult};
pub use prune::{PruneProgress, PruneStatus};
pub use search::{
    EpisodicMode, EpisodicRequest, EpisodicResponse, ScoredChunk, SearchFilter, SearchRequest,
    SearchResponse, SearchSource,
};
pub use session::{SessionInfo, Turn, TurnBlock};
