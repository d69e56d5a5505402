//! FTS5 keyword search with BM25 ranking and query sanitization.

use rusqlite::{params_from_iter, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::SearchFilter;

use crate::to_storage_err;

/// Neutralize FTS5 operators so arbitrary user text is a safe MATCH
/// expression. Reserved words and punctuation are stripped; the
/// surviving bare terms match with implicit AND.
pub fn sanitize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .filter(|w| {
            let upper = w.to_uppercase();
            upper != "AND" && upper != "OR" && upper != "NOT" && upper != "NEAR"
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// BM25-ranked full-text search. SQLite's `bm25()` is lower-is-better;
/// the negation makes scores positive and higher-is-better for callers.
pub fn search_keyword(
    conn: &Connection,
    query: &str,
    k: usize,
    filter: &SearchFilter,
) -> EngramResult<Vec<(String, f64)>> {
    let sanitized = sanitize_query(query);
    if sanitized.is_empty() {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT c.id, -bm25(chunk_fts) AS score
         FROM chunk_fts
         JOIN chunks c ON c.rowid = chunk_fts.rowid
         WHERE chunk_fts MATCH ?1",
    );
    let mut bindings: Vec<String> = vec![sanitized];
    if !filter.projects.is_empty() {
        let placeholders = (2..=filter.projects.len() + 1)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" AND c.project_slug IN ({placeholders})"));
        bindings.extend(filter.projects.iter().cloned());
    }
    if let Some(agent) = &filter.agent_id {
        sql.push_str(&format!(" AND c.agent_id = ?{}", bindings.len() + 1));
        bindings.push(agent.clone());
    }
    sql.push_str(&format!(" ORDER BY score DESC LIMIT {k}"));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params_from_iter(bindings.iter()), |row| {
            let id: String = row.get(0)?;
            let score: f64 = row.get(1)?;
            Ok((id, score))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}
