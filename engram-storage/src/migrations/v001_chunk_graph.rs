//! v001: chunks, edges, vectors, project_clocks.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS chunks (
            id                 TEXT PRIMARY KEY,
            session_id         TEXT NOT NULL,
            project_slug       TEXT NOT NULL,
            turn_indices       TEXT NOT NULL,
            start_time         TEXT NOT NULL,
            end_time           TEXT NOT NULL,
            content            TEXT NOT NULL,
            code_block_count   INTEGER NOT NULL DEFAULT 0,
            tool_use_count     INTEGER NOT NULL DEFAULT 0,
            approx_tokens      INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            agent_id           TEXT,
            vector_clock_json  TEXT,
            spawn_depth        INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_session ON chunks(session_id);
        CREATE INDEX IF NOT EXISTS idx_chunks_project ON chunks(project_slug);

        CREATE TABLE IF NOT EXISTS edges (
            id                 TEXT PRIMARY KEY,
            source_chunk_id    TEXT NOT NULL REFERENCES chunks(id) ON DELETE CASCADE,
            target_chunk_id    TEXT NOT NULL REFERENCES chunks(id) ON DELETE CASCADE,
            edge_type          TEXT NOT NULL CHECK(edge_type IN ('backward', 'forward')),
            reference_type     TEXT,
            initial_weight     REAL NOT NULL,
            created_at         TEXT NOT NULL,
            vector_clock_json  TEXT,
            link_count         INTEGER NOT NULL DEFAULT 1,
            UNIQUE(source_chunk_id, target_chunk_id, edge_type)
        );

        CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_chunk_id);
        CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_chunk_id);

        CREATE TABLE IF NOT EXISTS vectors (
            chunk_id      TEXT PRIMARY KEY REFERENCES chunks(id) ON DELETE CASCADE,
            project_slug  TEXT NOT NULL,
            embedding     BLOB NOT NULL,
            orphan_since  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_vectors_project ON vectors(project_slug);
        CREATE INDEX IF NOT EXISTS idx_vectors_orphan ON vectors(orphan_since)
            WHERE orphan_since IS NOT NULL;

        CREATE TABLE IF NOT EXISTS project_clocks (
            project_slug  TEXT PRIMARY KEY,
            clock_json    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
