//! Persistent embedding cache rows: lookups bump recency and hit
//! counts; inserts evict least-recently-used rows past the bound.

use chrono::Utc;
use rusqlite::{params, Connection};

use engram_core::codec::{pack_f32, unpack_f32};
use engram_core::errors::EngramResult;

use crate::to_storage_err;

/// Batch lookup keyed by `(content_hash, model_id)`. The result vector
/// is parallel to `hashes`.
pub fn cache_get_batch(
    conn: &Connection,
    hashes: &[String],
    model_id: &str,
) -> EngramResult<Vec<Option<Vec<f32>>>> {
    let now = Utc::now().to_rfc3339();
    let mut select = conn
        .prepare_cached(
            "SELECT embedding FROM embedding_cache
             WHERE content_hash = ?1 AND model_id = ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut touch = conn
        .prepare_cached(
            "UPDATE embedding_cache SET hit_count = hit_count + 1, last_used_at = ?3
             WHERE content_hash = ?1 AND model_id = ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::with_capacity(hashes.len());
    for hash in hashes {
        let result: Result<Vec<u8>, _> =
            select.query_row(params![hash, model_id], |row| row.get(0));
        match result {
            Ok(bytes) => {
                touch
                    .execute(params![hash, model_id, now])
                    .map_err(|e| to_storage_err(e.to_string()))?;
                out.push(Some(unpack_f32(&bytes)));
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => out.push(None),
            Err(e) => return Err(to_storage_err(e.to_string())),
        }
    }
    Ok(out)
}

/// Batch insert with LRU eviction in the same transaction scope: after
/// the writes, rows beyond `max_entries` go, oldest `last_used_at`
/// first.
pub fn cache_put_batch(
    conn: &Connection,
    entries: &[(String, Vec<f32>)],
    model_id: &str,
    max_entries: usize,
) -> EngramResult<()> {
    let now = Utc::now().to_rfc3339();
    let mut insert = conn
        .prepare_cached(
            "INSERT INTO embedding_cache
                (content_hash, model_id, embedding, created_at, last_used_at, hit_count)
             VALUES (?1, ?2, ?3, ?4, ?4, 0)
             ON CONFLICT(content_hash, model_id) DO UPDATE SET last_used_at = excluded.last_used_at",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    for (hash, vector) in entries {
        insert
            .execute(params![hash, model_id, pack_f32(vector), now])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    drop(insert);

    conn.execute(
        "DELETE FROM embedding_cache
         WHERE rowid IN (
            SELECT rowid FROM embedding_cache
            ORDER BY last_used_at ASC, rowid ASC
            LIMIT max(0, (SELECT COUNT(*) FROM embedding_cache) - ?1)
         )",
        params![max_entries as i64],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Cache row count (all models).
pub fn cache_len(conn: &Connection) -> EngramResult<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM embedding_cache", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}
