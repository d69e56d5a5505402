//! v003: clusters, chunk_clusters soft assignments.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS clusters (
            id               TEXT PRIMARY KEY,
            name             TEXT,
            description      TEXT,
            centroid         BLOB,
            exemplar_ids     TEXT,
            membership_hash  TEXT,
            created_at       TEXT NOT NULL,
            refreshed_at     TEXT
        );

        CREATE TABLE IF NOT EXISTS chunk_clusters (
            chunk_id    TEXT NOT NULL REFERENCES chunks(id) ON DELETE CASCADE,
            cluster_id  TEXT NOT NULL REFERENCES clusters(id) ON DELETE CASCADE,
            distance    REAL NOT NULL,
            PRIMARY KEY (chunk_id, cluster_id)
        );

        CREATE INDEX IF NOT EXISTS idx_chunk_clusters_cluster ON chunk_clusters(cluster_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
