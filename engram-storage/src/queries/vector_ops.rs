//! Vector blob storage and brute-force angular search.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use engram_core::codec::{angular_distance, pack_f32, unpack_f32};
use engram_core::errors::{EngramResult, StorageError};
use engram_core::models::SearchFilter;

use crate::to_storage_err;

pub fn insert_vector(
    conn: &Connection,
    chunk_id: &str,
    project_slug: &str,
    vector: &[f32],
) -> EngramResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO vectors (chunk_id, project_slug, embedding, orphan_since)
         VALUES (?1, ?2, ?3, NULL)",
        params![chunk_id, project_slug, pack_f32(vector)],
    )
    .map_err(|e| {
        engram_core::errors::EngramError::from(StorageError::VectorInsertFailed {
            chunk_id: chunk_id.to_string(),
            reason: e.to_string(),
        })
    })?;
    Ok(())
}

pub fn get_vector(conn: &Connection, chunk_id: &str) -> EngramResult<Option<Vec<f32>>> {
    let result: Result<Vec<u8>, _> = conn.query_row(
        "SELECT embedding FROM vectors WHERE chunk_id = ?1",
        params![chunk_id],
        |row| row.get(0),
    );
    match result {
        Ok(bytes) => Ok(Some(unpack_f32(&bytes))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(to_storage_err(e.to_string())),
    }
}

pub fn get_vectors(
    conn: &Connection,
    ids: &[String],
) -> EngramResult<HashMap<String, Vec<f32>>> {
    let mut out = HashMap::with_capacity(ids.len());
    for id in ids {
        if let Some(v) = get_vector(conn, id)? {
            out.insert(id.clone(), v);
        }
    }
    Ok(out)
}

/// Every stored vector. Feeds reclustering; memory scales with corpus
/// size, which brute-force search already assumes.
pub fn all_vectors(conn: &Connection) -> EngramResult<Vec<(String, Vec<f32>)>> {
    let mut stmt = conn
        .prepare_cached("SELECT chunk_id, embedding FROM vectors ORDER BY chunk_id")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((id, bytes))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        let (id, bytes) = row.map_err(|e| to_storage_err(e.to_string()))?;
        out.push((id, unpack_f32(&bytes)));
    }
    Ok(out)
}

/// Brute-force k-nearest by angular distance `1 − u·v`. O(n·dim) per
/// query. Project and agent filters are pushed into the SQL; distance
/// ranking happens here.
pub fn search_vectors(
    conn: &Connection,
    query: &[f32],
    k: usize,
    filter: &SearchFilter,
) -> EngramResult<Vec<(String, f64)>> {
    let (sql, bindings) = filtered_vector_sql(filter);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(bindings.iter()), |row| {
            let id: String = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((id, bytes))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(String, f64)> = Vec::new();
    for row in rows {
        let (id, bytes) = row.map_err(|e| to_storage_err(e.to_string()))?;
        let vector = unpack_f32(&bytes);
        if vector.len() != query.len() {
            continue;
        }
        scored.push((id, angular_distance(query, &vector)));
    }
    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    Ok(scored)
}

fn filtered_vector_sql(filter: &SearchFilter) -> (String, Vec<String>) {
    let mut sql = String::from(
        "SELECT v.chunk_id, v.embedding FROM vectors v
         JOIN chunks c ON c.id = v.chunk_id WHERE 1=1",
    );
    let mut bindings = Vec::new();
    if !filter.projects.is_empty() {
        let placeholders = (1..=filter.projects.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" AND v.project_slug IN ({placeholders})"));
        bindings.extend(filter.projects.iter().cloned());
    }
    if let Some(agent) = &filter.agent_id {
        sql.push_str(&format!(" AND c.agent_id = ?{}", bindings.len() + 1));
        bindings.push(agent.clone());
    }
    (sql, bindings)
}

pub fn mark_orphaned(conn: &Connection, chunk_id: &str, when: DateTime<Utc>) -> EngramResult<()> {
    conn.execute(
        "UPDATE vectors SET orphan_since = ?2 WHERE chunk_id = ?1 AND orphan_since IS NULL",
        params![chunk_id, when.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn clear_orphan(conn: &Connection, chunk_id: &str) -> EngramResult<()> {
    conn.execute(
        "UPDATE vectors SET orphan_since = NULL WHERE chunk_id = ?1",
        params![chunk_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Delete vectors (and, via their chunks, the FTS rows) whose orphan
/// grace period has expired. Returns the number of chunks removed.
pub fn cleanup_expired_orphans(
    conn: &Connection,
    ttl_hours: u64,
    now: DateTime<Utc>,
) -> EngramResult<usize> {
    let cutoff = now - chrono::Duration::hours(ttl_hours as i64);
    let mut stmt = conn
        .prepare(
            "SELECT chunk_id FROM vectors
             WHERE orphan_since IS NOT NULL AND orphan_since < ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![cutoff.to_rfc3339()], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut expired = Vec::new();
    for row in rows {
        expired.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    drop(stmt);

    // Deleting the chunk cascades to its vector row.
    for chunk_id in &expired {
        conn.execute("DELETE FROM chunks WHERE id = ?1", params![chunk_id])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(expired.len())
}
