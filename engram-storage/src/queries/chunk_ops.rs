//! Insert, get, delete, and session probes for chunks.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use engram_core::clock::VectorClock;
use engram_core::errors::{EngramResult, StorageError};
use engram_core::models::Chunk;

use crate::to_storage_err;

/// Parse one row of the full chunk column list.
pub fn parse_chunk_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let turn_indices_json: String = row.get("turn_indices")?;
    let clock_json: Option<String> = row.get("vector_clock_json")?;
    Ok(Chunk {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        project_slug: row.get("project_slug")?,
        turn_indices: serde_json::from_str(&turn_indices_json).unwrap_or_default(),
        start_time: parse_time(row, "start_time")?,
        end_time: parse_time(row, "end_time")?,
        content: row.get("content")?,
        code_block_count: row.get("code_block_count")?,
        tool_use_count: row.get("tool_use_count")?,
        approx_tokens: row.get("approx_tokens")?,
        created_at: parse_time(row, "created_at")?,
        agent_id: row.get("agent_id")?,
        vector_clock: clock_json.map(|j| VectorClock::from_json(&j)),
        spawn_depth: row.get("spawn_depth")?,
    })
}

fn parse_time(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(column)?;
    Ok(DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default())
}

pub const CHUNK_COLUMNS: &str = "id, session_id, project_slug, turn_indices, start_time, \
     end_time, content, code_block_count, tool_use_count, approx_tokens, created_at, \
     agent_id, vector_clock_json, spawn_depth";

/// Insert a batch of chunks. Caller owns the transaction. Duplicate ids
/// are rejected (primary key), failing the whole batch.
pub fn insert_chunks(conn: &Connection, chunks: &[Chunk]) -> EngramResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO chunks (
                id, session_id, project_slug, turn_indices, start_time, end_time,
                content, code_block_count, tool_use_count, approx_tokens,
                created_at, agent_id, vector_clock_json, spawn_depth
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    for chunk in chunks {
        let turn_indices = serde_json::to_string(&chunk.turn_indices)
            .map_err(|e| to_storage_err(e.to_string()))?;
        stmt.execute(params![
            chunk.id,
            chunk.session_id,
            chunk.project_slug,
            turn_indices,
            chunk.start_time.to_rfc3339(),
            chunk.end_time.to_rfc3339(),
            chunk.content,
            chunk.code_block_count,
            chunk.tool_use_count,
            chunk.approx_tokens,
            chunk.created_at.to_rfc3339(),
            chunk.agent_id,
            chunk.vector_clock.as_ref().map(|c| c.to_json()),
            chunk.spawn_depth,
        ])
        .map_err(|e| to_storage_err(format!("insert chunk {}: {e}", chunk.id)))?;
    }
    Ok(())
}

pub fn get_chunk(conn: &Connection, id: &str) -> EngramResult<Option<Chunk>> {
    let sql = format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = ?1");
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![id], parse_chunk_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

/// Fetch the chunk or fail with `CHUNK_NOT_FOUND`.
pub fn require_chunk(conn: &Connection, id: &str) -> EngramResult<Chunk> {
    get_chunk(conn, id)?.ok_or_else(|| {
        StorageError::ChunkNotFound { id: id.to_string() }.into()
    })
}

pub fn get_chunks(conn: &Connection, ids: &[String]) -> EngramResult<Vec<Chunk>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(chunk) = get_chunk(conn, id)? {
            out.push(chunk);
        }
    }
    Ok(out)
}

pub fn delete_chunk(conn: &Connection, id: &str) -> EngramResult<()> {
    conn.execute("DELETE FROM chunks WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Cheap idempotency probe: does any chunk of this session exist?
pub fn is_session_ingested(conn: &Connection, session_id: &str) -> EngramResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chunks WHERE session_id = ?1)",
        params![session_id],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// All chunks of a session in turn order (first covered turn index).
pub fn session_chunks(conn: &Connection, session_id: &str) -> EngramResult<Vec<Chunk>> {
    let sql = format!(
        "SELECT {CHUNK_COLUMNS} FROM chunks WHERE session_id = ?1 ORDER BY start_time, id"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![session_id], parse_chunk_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

/// Every chunk, ordered by id. Feeds archive export.
pub fn all_chunks(conn: &Connection) -> EngramResult<Vec<Chunk>> {
    let sql = format!("SELECT {CHUNK_COLUMNS} FROM chunks ORDER BY id");
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], parse_chunk_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

/// Most recent chunk of a project, optionally excluding one session.
/// Feeds cross-session continuation edges.
pub fn latest_project_chunk(
    conn: &Connection,
    project_slug: &str,
    exclude_session: Option<&str>,
) -> EngramResult<Option<Chunk>> {
    let sql = format!(
        "SELECT {CHUNK_COLUMNS} FROM chunks
         WHERE project_slug = ?1 AND (?2 IS NULL OR session_id != ?2)
         ORDER BY end_time DESC, id DESC LIMIT 1"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![project_slug, exclude_session], parse_chunk_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}
