//! Edge upsert, decayed reads, deletion, and scan pagination.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use engram_core::clock::VectorClock;
use engram_core::errors::{EngramResult, StorageError};
use engram_core::models::{Direction, Edge, EdgeType, EdgeUpsertStats, ReferenceType, WeightedEdge};
use engram_core::traits::WeightedEdgeSet;
use engram_decay::DecayEngine;

use crate::to_storage_err;

pub const EDGE_COLUMNS: &str = "id, source_chunk_id, target_chunk_id, edge_type, \
     reference_type, initial_weight, created_at, vector_clock_json, link_count";

/// Parse one row of the full edge column list.
pub fn parse_edge_row(row: &Row<'_>) -> rusqlite::Result<Edge> {
    let edge_type: String = row.get("edge_type")?;
    let reference_type: Option<String> = row.get("reference_type")?;
    let created_at: String = row.get("created_at")?;
    let clock_json: Option<String> = row.get("vector_clock_json")?;
    Ok(Edge {
        id: row.get("id")?,
        source_chunk_id: row.get("source_chunk_id")?,
        target_chunk_id: row.get("target_chunk_id")?,
        edge_type: EdgeType::parse(&edge_type).unwrap_or(EdgeType::Forward),
        reference_type: reference_type.as_deref().and_then(ReferenceType::parse),
        initial_weight: row.get("initial_weight")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default(),
        vector_clock: clock_json.map(|j| VectorClock::from_json(&j)),
        link_count: row.get("link_count")?,
    })
}

/// Atomic upsert of an edge batch. Caller owns the transaction.
///
/// On `(source, target, edge_type)` conflict only `link_count` moves;
/// the stored weight, reference type, and clock keep their first-written
/// values. Returns inserts and boosts separately.
pub fn create_or_boost_edges(conn: &Connection, edges: &[Edge]) -> EngramResult<EdgeUpsertStats> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO edges (
                id, source_chunk_id, target_chunk_id, edge_type, reference_type,
                initial_weight, created_at, vector_clock_json, link_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(source_chunk_id, target_chunk_id, edge_type)
            DO UPDATE SET link_count = link_count + 1",
        )
        .map_err(|e| {
            engram_core::errors::EngramError::from(StorageError::EdgeUpsertFailed {
                reason: e.to_string(),
            })
        })?;

    let mut stats = EdgeUpsertStats::default();
    for edge in edges {
        stmt.execute(params![
            edge.id,
            edge.source_chunk_id,
            edge.target_chunk_id,
            edge.edge_type.as_str(),
            edge.reference_type.map(|r| r.as_str()),
            edge.initial_weight,
            edge.created_at.to_rfc3339(),
            edge.vector_clock.as_ref().map(|c| c.to_json()),
            edge.link_count.max(1),
        ])
        .map_err(|e| {
            engram_core::errors::EngramError::from(StorageError::EdgeUpsertFailed {
                reason: format!("{} -> {}: {e}", edge.source_chunk_id, edge.target_chunk_id),
            })
        })?;

        // The upsert keeps the existing row id on conflict, so a changed
        // id distinguishes insert from boost.
        let stored_id: String = conn
            .query_row(
                "SELECT id FROM edges
                 WHERE source_chunk_id = ?1 AND target_chunk_id = ?2 AND edge_type = ?3",
                params![
                    edge.source_chunk_id,
                    edge.target_chunk_id,
                    edge.edge_type.as_str()
                ],
                |row| row.get(0),
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        if stored_id == edge.id {
            stats.inserted += 1;
        } else {
            stats.boosted += 1;
        }
    }
    Ok(stats)
}

/// Decayed edges of a chunk in the given traversal direction.
///
/// `Backward` leads into the past: incoming forward edges plus outgoing
/// backward (back-reference) edges. `Forward` is the mirror image. Dead
/// edges (effective weight 0) are split out by id for the pruner queue.
/// Live edges are ordered best-first: initial weight descending, id
/// ascending.
pub fn weighted_edges(
    conn: &Connection,
    decay: &DecayEngine,
    chunk_id: &str,
    direction: Direction,
    ref_clock: &VectorClock,
    now: DateTime<Utc>,
) -> EngramResult<WeightedEdgeSet> {
    let sql = match direction {
        Direction::Forward => format!(
            "SELECT {EDGE_COLUMNS} FROM edges
             WHERE (source_chunk_id = ?1 AND edge_type = 'forward')
                OR (target_chunk_id = ?1 AND edge_type = 'backward')
             ORDER BY initial_weight DESC, id ASC"
        ),
        Direction::Backward => format!(
            "SELECT {EDGE_COLUMNS} FROM edges
             WHERE (target_chunk_id = ?1 AND edge_type = 'forward')
                OR (source_chunk_id = ?1 AND edge_type = 'backward')
             ORDER BY initial_weight DESC, id ASC"
        ),
    };
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![chunk_id], parse_edge_row)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut set = WeightedEdgeSet::default();
    for row in rows {
        let edge = row.map_err(|e| to_storage_err(e.to_string()))?;
        let weight = decay.boosted_weight(&edge, direction, ref_clock, now);
        if weight <= 0.0 {
            set.dead_ids.push(edge.id);
        } else {
            set.live.push(WeightedEdge {
                edge,
                effective_weight: weight,
            });
        }
    }
    Ok(set)
}

pub fn get_edges(conn: &Connection, ids: &[String]) -> EngramResult<Vec<Edge>> {
    let sql = format!("SELECT {EDGE_COLUMNS} FROM edges WHERE id = ?1");
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for id in ids {
        let mut rows = stmt
            .query_map(params![id], parse_edge_row)
            .map_err(|e| to_storage_err(e.to_string()))?;
        if let Some(row) = rows.next() {
            out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
        }
    }
    Ok(out)
}

pub fn delete_edges(conn: &Connection, ids: &[String]) -> EngramResult<usize> {
    let mut deleted = 0;
    let mut stmt = conn
        .prepare_cached("DELETE FROM edges WHERE id = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    for id in ids {
        deleted += stmt
            .execute(params![id])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(deleted)
}

pub fn chunk_has_edges(conn: &Connection, chunk_id: &str) -> EngramResult<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM edges WHERE source_chunk_id = ?1 OR target_chunk_id = ?1
        )",
        params![chunk_id],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Keyset pagination over all edges, ordered by id.
pub fn edge_batch(
    conn: &Connection,
    after_id: Option<&str>,
    limit: usize,
) -> EngramResult<Vec<Edge>> {
    let sql = format!(
        "SELECT {EDGE_COLUMNS} FROM edges
         WHERE (?1 IS NULL OR id > ?1) ORDER BY id ASC LIMIT ?2"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![after_id, limit as i64], parse_edge_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

pub fn edge_count(conn: &Connection) -> EngramResult<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}
