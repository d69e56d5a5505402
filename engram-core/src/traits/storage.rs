use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::clock::VectorClock;
use crate::errors::EngramResult;
use crate::models::{
    Chunk, Cluster, ClusterAssignment, Direction, Edge, EdgeUpsertStats, SearchFilter,
    WeightedEdge,
};

/// Result of a decayed edge read: live edges plus the ids of edges whose
/// effective weight hit zero. Dead ids go to the pruner queue; the read
/// itself never deletes.
#[derive(Debug, Clone, Default)]
pub struct WeightedEdgeSet {
    pub live: Vec<WeightedEdge>,
    pub dead_ids: Vec<String>,
}

/// Chunk, edge, vector, keyword, and project-clock persistence.
pub trait IMemoryStore: Send + Sync {
    // --- Chunks ---
    /// Atomic batch insert. Rejects duplicate ids.
    fn insert_chunks(&self, chunks: &[Chunk]) -> EngramResult<()>;
    fn get_chunk(&self, id: &str) -> EngramResult<Option<Chunk>>;
    fn get_chunks(&self, ids: &[String]) -> EngramResult<Vec<Chunk>>;
    fn delete_chunk(&self, id: &str) -> EngramResult<()>;
    /// Cheap idempotency probe used before re-ingesting a session.
    fn is_session_ingested(&self, session_id: &str) -> EngramResult<bool>;
    /// Chunks of one session in turn order.
    fn session_chunks(&self, session_id: &str) -> EngramResult<Vec<Chunk>>;
    /// Most recent chunk of a project, optionally excluding a session.
    fn latest_project_chunk(
        &self,
        project_slug: &str,
        exclude_session: Option<&str>,
    ) -> EngramResult<Option<Chunk>>;

    /// One ingest transaction: chunks, their vectors, FTS rows, and
    /// same-session edges become visible atomically.
    fn ingest_transaction(
        &self,
        chunks: &[Chunk],
        vectors: &[(String, Vec<f32>)],
        edges: &[Edge],
    ) -> EngramResult<EdgeUpsertStats>;

    // --- Edges ---
    /// Atomic upsert. On `(source, target, edge_type)` conflict the row's
    /// `link_count` is incremented and its first-written attributes kept.
    fn create_or_boost_edges(&self, edges: &[Edge]) -> EngramResult<EdgeUpsertStats>;
    /// Decayed edges of a chunk in the given direction, with dead edge
    /// ids split out for the pruner.
    fn weighted_edges(
        &self,
        chunk_id: &str,
        direction: Direction,
        ref_clock: &VectorClock,
    ) -> EngramResult<WeightedEdgeSet>;
    /// Edges by id; unknown ids are silently absent from the result.
    fn get_edges(&self, ids: &[String]) -> EngramResult<Vec<Edge>>;
    fn delete_edges(&self, ids: &[String]) -> EngramResult<usize>;
    fn chunk_has_edges(&self, chunk_id: &str) -> EngramResult<bool>;
    /// Keyset-paginated scan over all edges, ordered by id.
    fn edge_batch(&self, after_id: Option<&str>, limit: usize) -> EngramResult<Vec<Edge>>;
    fn edge_count(&self) -> EngramResult<usize>;

    // --- Vectors ---
    fn insert_vector(
        &self,
        chunk_id: &str,
        project_slug: &str,
        vector: &[f32],
    ) -> EngramResult<()>;
    fn get_vector(&self, chunk_id: &str) -> EngramResult<Option<Vec<f32>>>;
    fn get_vectors(&self, ids: &[String]) -> EngramResult<HashMap<String, Vec<f32>>>;
    /// Every stored vector with its chunk id. Feeds reclustering.
    fn all_vectors(&self) -> EngramResult<Vec<(String, Vec<f32>)>>;
    /// Brute-force angular search: the k nearest as `(chunk_id,
    /// distance)`, smallest distance first.
    fn search_vectors(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> EngramResult<Vec<(String, f64)>>;
    fn mark_vector_orphaned(&self, chunk_id: &str, when: DateTime<Utc>) -> EngramResult<()>;
    fn clear_vector_orphan(&self, chunk_id: &str) -> EngramResult<()>;
    /// Delete vectors (and their chunks) orphaned longer than the TTL.
    fn cleanup_expired_orphans(&self, ttl_hours: u64, now: DateTime<Utc>)
        -> EngramResult<usize>;

    // --- Keyword ---
    /// BM25-ranked full-text search as `(chunk_id, score)`, higher
    /// score first, scores positive.
    fn search_keyword(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> EngramResult<Vec<(String, f64)>>;

    // --- Project clocks ---
    /// Current clock for a project; the empty clock when unseen.
    fn project_clock(&self, project_slug: &str) -> EngramResult<VectorClock>;
    fn save_project_clock(&self, project_slug: &str, clock: &VectorClock) -> EngramResult<()>;
}

/// Cluster rows and soft assignments.
pub trait IClusterStore: Send + Sync {
    fn get_cluster(&self, id: &str) -> EngramResult<Option<Cluster>>;
    fn all_clusters(&self) -> EngramResult<Vec<Cluster>>;
    fn delete_cluster(&self, id: &str) -> EngramResult<()>;
    /// Atomic: upsert the cluster row and replace all of its
    /// assignments in one transaction.
    fn replace_cluster(
        &self,
        cluster: &Cluster,
        assignments: &[ClusterAssignment],
    ) -> EngramResult<()>;
    /// Idempotent: clearing an unknown or empty cluster succeeds.
    fn clear_cluster_assignments(&self, cluster_id: &str) -> EngramResult<()>;
    fn assign_chunks_to_clusters(&self, assignments: &[ClusterAssignment]) -> EngramResult<()>;
    /// Assignments touching any of the given chunks.
    fn assignments_for_chunks(
        &self,
        chunk_ids: &[String],
    ) -> EngramResult<Vec<ClusterAssignment>>;
    /// Members of one cluster, closest first.
    fn cluster_members(&self, cluster_id: &str) -> EngramResult<Vec<ClusterAssignment>>;
    /// Clusters never refreshed or refreshed before the cutoff.
    fn stale_clusters(&self, max_age_hours: u64, now: DateTime<Utc>)
        -> EngramResult<Vec<Cluster>>;
    /// Out-of-band label refresh: set name/description and stamp
    /// `refreshed_at`.
    fn set_cluster_label(
        &self,
        id: &str,
        name: &str,
        description: &str,
        refreshed_at: DateTime<Utc>,
    ) -> EngramResult<()>;
}

/// Persistent embedding cache keyed by `(content_hash, model_id)`.
pub trait IEmbeddingCacheStore: Send + Sync {
    /// Batch lookup; the result is parallel to `hashes`. Hits bump the
    /// row's hit count and recency.
    fn cache_get_batch(
        &self,
        hashes: &[String],
        model_id: &str,
    ) -> EngramResult<Vec<Option<Vec<f32>>>>;

    /// Batch insert. Evicts least-recently-used rows beyond
    /// `max_entries` inside the same transaction.
    fn cache_put_batch(
        &self,
        entries: &[(String, Vec<f32>)],
        model_id: &str,
        max_entries: usize,
    ) -> EngramResult<()>;
}
