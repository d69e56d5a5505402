//! v004: persistent embedding cache keyed by (content_hash, model_id).

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS embedding_cache (
            content_hash  TEXT NOT NULL,
            model_id      TEXT NOT NULL,
            embedding     BLOB NOT NULL,
            created_at    TEXT NOT NULL,
            last_used_at  TEXT NOT NULL,
            hit_count     INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (content_hash, model_id)
        );

        CREATE INDEX IF NOT EXISTS idx_embedding_cache_lru
            ON embedding_cache(model_id, last_used_at);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
