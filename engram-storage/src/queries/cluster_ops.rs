//! Cluster rows and soft assignments.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use engram_core::codec::{pack_f32, unpack_f32};
use engram_core::errors::EngramResult;
use engram_core::models::{Cluster, ClusterAssignment};

use crate::to_storage_err;

pub const CLUSTER_COLUMNS: &str =
    "id, name, description, centroid, exemplar_ids, membership_hash, created_at, refreshed_at";

pub fn parse_cluster_row(row: &Row<'_>) -> rusqlite::Result<Cluster> {
    let centroid: Option<Vec<u8>> = row.get("centroid")?;
    let exemplar_json: Option<String> = row.get("exemplar_ids")?;
    let created_at: String = row.get("created_at")?;
    let refreshed_at: Option<String> = row.get("refreshed_at")?;
    Ok(Cluster {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        centroid: centroid.map(|b| unpack_f32(&b)),
        exemplar_ids: exemplar_json
            .and_then(|j| serde_json::from_str(&j).ok())
            .unwrap_or_default(),
        membership_hash: row.get("membership_hash")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default(),
        refreshed_at: refreshed_at.and_then(|t| {
            DateTime::parse_from_rfc3339(&t)
                .map(|t| t.with_timezone(&Utc))
                .ok()
        }),
    })
}

/// Upsert the cluster row. Name and description survive recluster runs;
/// centroid, exemplars, and membership hash are replaced.
pub fn upsert_cluster(conn: &Connection, cluster: &Cluster) -> EngramResult<()> {
    let exemplar_json =
        serde_json::to_string(&cluster.exemplar_ids).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO clusters (
            id, name, description, centroid, exemplar_ids, membership_hash,
            created_at, refreshed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            centroid = excluded.centroid,
            exemplar_ids = excluded.exemplar_ids,
            membership_hash = excluded.membership_hash",
        params![
            cluster.id,
            cluster.name,
            cluster.description,
            cluster.centroid.as_ref().map(|c| pack_f32(c)),
            exemplar_json,
            cluster.membership_hash,
            cluster.created_at.to_rfc3339(),
            cluster.refreshed_at.map(|t| t.to_rfc3339()),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_cluster(conn: &Connection, id: &str) -> EngramResult<Option<Cluster>> {
    let sql = format!("SELECT {CLUSTER_COLUMNS} FROM clusters WHERE id = ?1");
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![id], parse_cluster_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

pub fn all_clusters(conn: &Connection) -> EngramResult<Vec<Cluster>> {
    let sql = format!("SELECT {CLUSTER_COLUMNS} FROM clusters ORDER BY id");
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], parse_cluster_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

pub fn delete_cluster(conn: &Connection, id: &str) -> EngramResult<()> {
    conn.execute("DELETE FROM clusters WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Idempotent: clearing an unknown cluster is a no-op.
pub fn clear_cluster_assignments(conn: &Connection, cluster_id: &str) -> EngramResult<()> {
    conn.execute(
        "DELETE FROM chunk_clusters WHERE cluster_id = ?1",
        params![cluster_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn assign_chunks_to_clusters(
    conn: &Connection,
    assignments: &[ClusterAssignment],
) -> EngramResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR REPLACE INTO chunk_clusters (chunk_id, cluster_id, distance)
             VALUES (?1, ?2, ?3)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    for a in assignments {
        stmt.execute(params![a.chunk_id, a.cluster_id, a.distance])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}

pub fn assignments_for_chunks(
    conn: &Connection,
    chunk_ids: &[String],
) -> EngramResult<Vec<ClusterAssignment>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT chunk_id, cluster_id, distance FROM chunk_clusters WHERE chunk_id = ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for chunk_id in chunk_ids {
        let rows = stmt
            .query_map(params![chunk_id], |row| {
                Ok(ClusterAssignment {
                    chunk_id: row.get(0)?,
                    cluster_id: row.get(1)?,
                    distance: row.get(2)?,
                })
            })
            .map_err(|e| to_storage_err(e.to_string()))?;
        for row in rows {
            out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
        }
    }
    Ok(out)
}

/// Members of one cluster, closest to the centroid first.
pub fn cluster_members(
    conn: &Connection,
    cluster_id: &str,
) -> EngramResult<Vec<ClusterAssignment>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT chunk_id, cluster_id, distance FROM chunk_clusters
             WHERE cluster_id = ?1 ORDER BY distance ASC, chunk_id ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![cluster_id], |row| {
            Ok(ClusterAssignment {
                chunk_id: row.get(0)?,
                cluster_id: row.get(1)?,
                distance: row.get(2)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

/// Clusters never refreshed, or last refreshed before the cutoff.
pub fn stale_clusters(
    conn: &Connection,
    max_age_hours: u64,
    now: DateTime<Utc>,
) -> EngramResult<Vec<Cluster>> {
    let cutoff = now - chrono::Duration::hours(max_age_hours as i64);
    let sql = format!(
        "SELECT {CLUSTER_COLUMNS} FROM clusters
         WHERE refreshed_at IS NULL OR refreshed_at < ?1 ORDER BY id"
    );
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![cutoff.to_rfc3339()], parse_cluster_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

/// Out-of-band label refresh.
pub fn set_cluster_label(
    conn: &Connection,
    id: &str,
    name: &str,
    description: &str,
    refreshed_at: DateTime<Utc>,
) -> EngramResult<()> {
    conn.execute(
        "UPDATE clusters SET name = ?2, description = ?3, refreshed_at = ?4 WHERE id = ?1",
        params![id, name, description, refreshed_at.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
