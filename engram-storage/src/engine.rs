//! StorageEngine — owns the ConnectionPool, implements the core storage
//! traits, runs migrations on open, writes audit rows for lifecycle
//! events.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rusqlite::Connection;

use engram_core::clock::VectorClock;
use engram_core::config::StorageConfig;
use engram_core::errors::EngramResult;
use engram_core::models::{
    Chunk, Cluster, ClusterAssignment, Direction, Edge, EdgeUpsertStats, SearchFilter,
};
use engram_core::traits::{IClusterStore, IEmbeddingCacheStore, IMemoryStore, WeightedEdgeSet};
use engram_decay::DecayEngine;

use crate::audit::{AuditAction, AuditLogger};
use crate::keys::KeyMaterial;
use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries;
use crate::to_storage_err;

/// The main storage engine. Owns the connection pool, the decay engine
/// used for weighted edge reads, and a write-through project clock
/// cache.
pub struct StorageEngine {
    pool: ConnectionPool,
    decay: DecayEngine,
    audit: AuditLogger,
    clock_cache: DashMap<String, VectorClock>,
}

impl StorageEngine {
    /// Open a storage engine per the given configuration. The key, when
    /// present, is applied to every connection before first use.
    pub fn open(
        config: &StorageConfig,
        decay: DecayEngine,
        key: Option<KeyMaterial>,
    ) -> EngramResult<Self> {
        let pool = match &config.db_path {
            Some(path) => ConnectionPool::open(path, config.read_pool_size, key.as_ref())?,
            None => ConnectionPool::open_in_memory()?,
        };
        let engine = Self {
            pool,
            decay,
            audit: AuditLogger::new(config.audit_enabled),
            clock_cache: DashMap::new(),
        };
        engine.initialize(key.is_some())?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing).
    pub fn open_in_memory() -> EngramResult<Self> {
        Self::open(&StorageConfig::default(), DecayEngine::default(), None)
    }

    /// Open a file-backed engine with defaults (for tests that need
    /// read/write separation).
    pub fn open_at(path: &Path) -> EngramResult<Self> {
        let config = StorageConfig {
            db_path: Some(path.to_path_buf()),
            ..Default::default()
        };
        Self::open(&config, DecayEngine::default(), None)
    }

    fn initialize(&self, keyed: bool) -> EngramResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            migrations::run_migrations(conn)?;
            self.audit.log(conn, AuditAction::Open, "engine opened");
            if keyed {
                self.audit.log(conn, AuditAction::KeyAccess, "key applied");
            }
            Ok(())
        })
    }

    /// Record a clean shutdown in the audit log.
    pub fn close(&self) {
        let _ = self.pool.writer.with_conn_sync(|conn| {
            self.audit.log(conn, AuditAction::Close, "engine closed");
            Ok(())
        });
    }

    pub fn decay_engine(&self) -> &DecayEngine {
        &self.decay
    }

    pub fn audit_logger(&self) -> &AuditLogger {
        &self.audit
    }

    /// Execute a read-only query on the best available connection.
    fn with_reader<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        self.pool.with_reader(f)
    }

    /// Run a closure inside one write transaction.
    fn in_transaction<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        self.pool.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| to_storage_err(format!("begin: {e}")))?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()
                        .map_err(|e| to_storage_err(format!("commit: {e}")))?;
                    Ok(value)
                }
                Err(e) => {
                    let _ = tx.rollback();
                    Err(e)
                }
            }
        })
    }

    /// Forget cached clocks (test hook for cache coherence checks).
    pub fn invalidate_clock_cache(&self) {
        self.clock_cache.clear();
    }

    /// Every chunk in the store. Feeds archive export.
    pub fn all_chunks(&self) -> EngramResult<Vec<Chunk>> {
        self.with_reader(queries::chunk_ops::all_chunks)
    }
}

impl IMemoryStore for StorageEngine {
    fn insert_chunks(&self, chunks: &[Chunk]) -> EngramResult<()> {
        self.in_transaction(|conn| queries::chunk_ops::insert_chunks(conn, chunks))
    }

    fn get_chunk(&self, id: &str) -> EngramResult<Option<Chunk>> {
        self.with_reader(|conn| queries::chunk_ops::get_chunk(conn, id))
    }

    fn get_chunks(&self, ids: &[String]) -> EngramResult<Vec<Chunk>> {
        self.with_reader(|conn| queries::chunk_ops::get_chunks(conn, ids))
    }

    fn delete_chunk(&self, id: &str) -> EngramResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::chunk_ops::delete_chunk(conn, id))
    }

    fn is_session_ingested(&self, session_id: &str) -> EngramResult<bool> {
        self.with_reader(|conn| queries::chunk_ops::is_session_ingested(conn, session_id))
    }

    fn session_chunks(&self, session_id: &str) -> EngramResult<Vec<Chunk>> {
        self.with_reader(|conn| queries::chunk_ops::session_chunks(conn, session_id))
    }

    fn latest_project_chunk(
        &self,
        project_slug: &str,
        exclude_session: Option<&str>,
    ) -> EngramResult<Option<Chunk>> {
        self.with_reader(|conn| {
            queries::chunk_ops::latest_project_chunk(conn, project_slug, exclude_session)
        })
    }

    fn ingest_transaction(
        &self,
        chunks: &[Chunk],
        vectors: &[(String, Vec<f32>)],
        edges: &[Edge],
    ) -> EngramResult<EdgeUpsertStats> {
        let stats = self.in_transaction(|conn| {
            queries::chunk_ops::insert_chunks(conn, chunks)?;
            for (chunk_id, vector) in vectors {
                let project = chunks
                    .iter()
                    .find(|c| &c.id == chunk_id)
                    .map(|c| c.project_slug.as_str())
                    .unwrap_or_default();
                queries::vector_ops::insert_vector(conn, chunk_id, project, vector)?;
            }
            queries::edge_ops::create_or_boost_edges(conn, edges)
        })?;
        self.pool.writer.with_conn_sync(|conn| {
            self.audit.log(
                conn,
                AuditAction::Query,
                &format!("ingest: {} chunks, {} edges", chunks.len(), edges.len()),
            );
            Ok(())
        })?;
        Ok(stats)
    }

    fn create_or_boost_edges(&self, edges: &[Edge]) -> EngramResult<EdgeUpsertStats> {
        self.in_transaction(|conn| queries::edge_ops::create_or_boost_edges(conn, edges))
    }

    fn weighted_edges(
        &self,
        chunk_id: &str,
        direction: Direction,
        ref_clock: &VectorClock,
    ) -> EngramResult<WeightedEdgeSet> {
        self.with_reader(|conn| {
            queries::edge_ops::weighted_edges(
                conn,
                &self.decay,
                chunk_id,
                direction,
                ref_clock,
                Utc::now(),
            )
        })
    }

    fn get_edges(&self, ids: &[String]) -> EngramResult<Vec<Edge>> {
        self.with_reader(|conn| queries::edge_ops::get_edges(conn, ids))
    }

    fn delete_edges(&self, ids: &[String]) -> EngramResult<usize> {
        self.in_transaction(|conn| queries::edge_ops::delete_edges(conn, ids))
    }

    fn chunk_has_edges(&self, chunk_id: &str) -> EngramResult<bool> {
        self.with_reader(|conn| queries::edge_ops::chunk_has_edges(conn, chunk_id))
    }

    fn edge_batch(&self, after_id: Option<&str>, limit: usize) -> EngramResult<Vec<Edge>> {
        self.with_reader(|conn| queries::edge_ops::edge_batch(conn, after_id, limit))
    }

    fn edge_count(&self) -> EngramResult<usize> {
        self.with_reader(queries::edge_ops::edge_count)
    }

    fn insert_vector(
        &self,
        chunk_id: &str,
        project_slug: &str,
        vector: &[f32],
    ) -> EngramResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            queries::vector_ops::insert_vector(conn, chunk_id, project_slug, vector)
        })
    }

    fn get_vector(&self, chunk_id: &str) -> EngramResult<Option<Vec<f32>>> {
        self.with_reader(|conn| queries::vector_ops::get_vector(conn, chunk_id))
    }

    fn get_vectors(&self, ids: &[String]) -> EngramResult<HashMap<String, Vec<f32>>> {
        self.with_reader(|conn| queries::vector_ops::get_vectors(conn, ids))
    }

    fn all_vectors(&self) -> EngramResult<Vec<(String, Vec<f32>)>> {
        self.with_reader(queries::vector_ops::all_vectors)
    }

    fn search_vectors(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> EngramResult<Vec<(String, f64)>> {
        self.with_reader(|conn| queries::vector_ops::search_vectors(conn, query, k, filter))
    }

    fn mark_vector_orphaned(&self, chunk_id: &str, when: DateTime<Utc>) -> EngramResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::vector_ops::mark_orphaned(conn, chunk_id, when))
    }

    fn clear_vector_orphan(&self, chunk_id: &str) -> EngramResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::vector_ops::clear_orphan(conn, chunk_id))
    }

    fn cleanup_expired_orphans(
        &self,
        ttl_hours: u64,
        now: DateTime<Utc>,
    ) -> EngramResult<usize> {
        self.in_transaction(|conn| {
            queries::vector_ops::cleanup_expired_orphans(conn, ttl_hours, now)
        })
    }

    fn search_keyword(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> EngramResult<Vec<(String, f64)>> {
        self.with_reader(|conn| queries::keyword_search::search_keyword(conn, query, k, filter))
    }

    fn project_clock(&self, project_slug: &str) -> EngramResult<VectorClock> {
        if let Some(cached) = self.clock_cache.get(project_slug) {
            return Ok(cached.clone());
        }
        let clock =
            self.with_reader(|conn| queries::clock_ops::project_clock(conn, project_slug))?;
        self.clock_cache
            .insert(project_slug.to_string(), clock.clone());
        Ok(clock)
    }

    fn save_project_clock(&self, project_slug: &str, clock: &VectorClock) -> EngramResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::clock_ops::save_project_clock(conn, project_slug, clock))?;
        self.clock_cache
            .insert(project_slug.to_string(), clock.clone());
        Ok(())
    }
}

impl IClusterStore for StorageEngine {
    fn get_cluster(&self, id: &str) -> EngramResult<Option<Cluster>> {
        self.with_reader(|conn| queries::cluster_ops::get_cluster(conn, id))
    }

    fn all_clusters(&self) -> EngramResult<Vec<Cluster>> {
        self.with_reader(queries::cluster_ops::all_clusters)
    }

    fn delete_cluster(&self, id: &str) -> EngramResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::cluster_ops::delete_cluster(conn, id))
    }

    fn replace_cluster(
        &self,
        cluster: &Cluster,
        assignments: &[ClusterAssignment],
    ) -> EngramResult<()> {
        self.in_transaction(|conn| {
            queries::cluster_ops::upsert_cluster(conn, cluster)?;
            queries::cluster_ops::clear_cluster_assignments(conn, &cluster.id)?;
            queries::cluster_ops::assign_chunks_to_clusters(conn, assignments)
        })
    }

    fn clear_cluster_assignments(&self, cluster_id: &str) -> EngramResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::cluster_ops::clear_cluster_assignments(conn, cluster_id))
    }

    fn assign_chunks_to_clusters(&self, assignments: &[ClusterAssignment]) -> EngramResult<()> {
        self.in_transaction(|conn| {
            queries::cluster_ops::assign_chunks_to_clusters(conn, assignments)
        })
    }

    fn assignments_for_chunks(
        &self,
        chunk_ids: &[String],
    ) -> EngramResult<Vec<ClusterAssignment>> {
        self.with_reader(|conn| queries::cluster_ops::assignments_for_chunks(conn, chunk_ids))
    }

    fn cluster_members(&self, cluster_id: &str) -> EngramResult<Vec<ClusterAssignment>> {
        self.with_reader(|conn| queries::cluster_ops::cluster_members(conn, cluster_id))
    }

    fn stale_clusters(
        &self,
        max_age_hours: u64,
        now: DateTime<Utc>,
    ) -> EngramResult<Vec<Cluster>> {
        self.with_reader(|conn| queries::cluster_ops::stale_clusters(conn, max_age_hours, now))
    }

    fn set_cluster_label(
        &self,
        id: &str,
        name: &str,
        description: &str,
        refreshed_at: DateTime<Utc>,
    ) -> EngramResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            queries::cluster_ops::set_cluster_label(conn, id, name, description, refreshed_at)
        })
    }
}

impl IEmbeddingCacheStore for StorageEngine {
    fn cache_get_batch(
        &self,
        hashes: &[String],
        model_id: &str,
    ) -> EngramResult<Vec<Option<Vec<f32>>>> {
        // Hits write back recency, so this goes through the writer.
        self.pool
            .writer
            .with_conn_sync(|conn| queries::cache_ops::cache_get_batch(conn, hashes, model_id))
    }

    fn cache_put_batch(
        &self,
        entries: &[(String, Vec<f32>)],
        model_id: &str,
        max_entries: usize,
    ) -> EngramResult<()> {
        self.in_transaction(|conn| {
            queries::cache_ops::cache_put_batch(conn, entries, model_id, max_entries)
        })
    }
}
