//! Project clock persistence.

use chrono::Utc;
use rusqlite::{params, Connection};

use engram_core::clock::VectorClock;
use engram_core::errors::EngramResult;

use crate::to_storage_err;

/// Current clock for a project; the empty clock when unseen.
pub fn project_clock(conn: &Connection, project_slug: &str) -> EngramResult<VectorClock> {
    let result: Result<String, _> = conn.query_row(
        "SELECT clock_json FROM project_clocks WHERE project_slug = ?1",
        params![project_slug],
        |row| row.get(0),
    );
    match result {
        Ok(json) => Ok(VectorClock::from_json(&json)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(VectorClock::new()),
        Err(e) => Err(to_storage_err(e.to_string())),
    }
}

pub fn save_project_clock(
    conn: &Connection,
    project_slug: &str,
    clock: &VectorClock,
) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO project_clocks (project_slug, clock_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(project_slug) DO UPDATE SET
            clock_json = excluded.clock_json,
            updated_at = excluded.updated_at",
        params![project_slug, clock.to_json(), Utc::now().to_rfc3339()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
