//! Cluster expansion: pull sibling chunks of the top hits' clusters
//! into the candidate set.

use std::collections::HashSet;

use engram_core::errors::EngramResult;
use engram_core::models::{SearchFilter, SearchSource};
use engram_core::traits::{IClusterStore, IMemoryStore};

use crate::fusion::FusedHit;

/// For up to `max_clusters` distinct clusters referenced by the ranked
/// hits, add up to `max_siblings` member chunks not already present.
/// A sibling scores `hit.score × (1 − assignment.distance)` and is
/// tagged `cluster`.
pub fn expand_clusters<S>(
    store: &S,
    hits: &[FusedHit],
    filter: &SearchFilter,
    max_clusters: usize,
    max_siblings: usize,
) -> EngramResult<Vec<FusedHit>>
where
    S: IMemoryStore + IClusterStore + ?Sized,
{
    if hits.is_empty() || max_clusters == 0 || max_siblings == 0 {
        return Ok(Vec::new());
    }

    let present: HashSet<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    let hit_ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
    let assignments = store.assignments_for_chunks(&hit_ids)?;

    // Clusters in hit-rank order, deduplicated.
    let mut cluster_order: Vec<(String, String)> = Vec::new();
    let mut seen_clusters = HashSet::new();
    for hit in hits {
        for a in assignments.iter().filter(|a| a.chunk_id == hit.id) {
            if seen_clusters.insert(a.cluster_id.clone()) {
                cluster_order.push((a.cluster_id.clone(), hit.id.clone()));
            }
        }
        if cluster_order.len() >= max_clusters {
            break;
        }
    }
    cluster_order.truncate(max_clusters);

    let mut siblings = Vec::new();
    let mut added: HashSet<String> = HashSet::new();
    for (cluster_id, via_hit) in cluster_order {
        let hit_score = hits
            .iter()
            .find(|h| h.id == via_hit)
            .map(|h| h.score)
            .unwrap_or(0.0);

        let mut taken = 0;
        for member in store.cluster_members(&cluster_id)? {
            if taken >= max_siblings {
                break;
            }
            if present.contains(member.chunk_id.as_str()) || added.contains(&member.chunk_id) {
                continue;
            }
            if !passes_filter(store, &member.chunk_id, filter)? {
                continue;
            }
            siblings.push(FusedHit {
                id: member.chunk_id.clone(),
                score: hit_score * (1.0 - member.distance),
                source: SearchSource::Cluster,
            });
            added.insert(member.chunk_id);
            taken += 1;
        }
    }

    tracing::debug!(siblings = siblings.len(), "cluster expansion");
    Ok(siblings)
}

fn passes_filter<S>(store: &S, chunk_id: &str, filter: &SearchFilter) -> EngramResult<bool>
where
    S: IMemoryStore + ?Sized,
{
    if filter.projects.is_empty() && filter.agent_id.is_none() {
        return Ok(true);
    }
    let Some(chunk) = store.get_chunk(chunk_id)? else {
        return Ok(false);
    };
    if !filter.projects.is_empty() && !filter.projects.contains(&chunk.project_slug) {
        return Ok(false);
    }
    if let Some(agent) = &filter.agent_id {
        if chunk.agent_id.as_deref() != Some(agent.as_str()) {
            return Ok(false);
        }
    }
    Ok(true)
}
