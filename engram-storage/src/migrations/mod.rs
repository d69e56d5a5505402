//! Numbered schema migrations, applied in order inside one transaction.

mod v001_chunk_graph;
mod v002_keyword_index;
mod v003_clusters;
mod v004_embedding_cache;
mod v005_audit_log;

use rusqlite::Connection;

use engram_core::errors::{EngramResult, StorageError};

use crate::to_storage_err;

/// Latest schema version.
pub const SCHEMA_VERSION: u32 = 5;

/// Run all pending migrations. Idempotent: already-applied versions are
/// skipped based on the `schema_version` table.
pub fn run_migrations(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let current = current_version(conn)?;
    let steps: &[(u32, fn(&Connection) -> EngramResult<()>)] = &[
        (1, v001_chunk_graph::migrate),
        (2, v002_keyword_index::migrate),
        (3, v003_clusters::migrate),
        (4, v004_embedding_cache::migrate),
        (5, v005_audit_log::migrate),
    ];

    for (version, migrate) in steps {
        if *version <= current {
            continue;
        }
        migrate(conn).map_err(|e| {
            engram_core::errors::EngramError::from(StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })
        })?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [*version],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(version, "migration applied");
    }
    Ok(())
}

/// Highest applied version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> EngramResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
