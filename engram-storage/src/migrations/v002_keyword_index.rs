//! v002: FTS5 keyword index over chunk content, Porter-stemmed.
//!
//! External-content table: rows mirror `chunks` by rowid and are kept in
//! sync by triggers, so content is stored once.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE VIRTUAL TABLE IF NOT EXISTS chunk_fts USING fts5(
            content,
            project_slug UNINDEXED,
            content='chunks',
            content_rowid='rowid',
            tokenize='porter unicode61'
        );

        CREATE TRIGGER IF NOT EXISTS chunk_fts_insert AFTER INSERT ON chunks BEGIN
            INSERT INTO chunk_fts(rowid, content, project_slug)
            VALUES (new.rowid, new.content, new.project_slug);
        END;

        CREATE TRIGGER IF NOT EXISTS chunk_fts_delete AFTER DELETE ON chunks BEGIN
            INSERT INTO chunk_fts(chunk_fts, rowid, content, project_slug)
            VALUES ('delete', old.rowid, old.content, old.project_slug);
        END;
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
