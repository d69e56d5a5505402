//! Vacuum and integrity helpers.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn full_vacuum(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch("VACUUM;")
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn integrity_check(conn: &Connection) -> EngramResult<bool> {
    let result: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(result.eq_ignore_ascii_case("ok"))
}
