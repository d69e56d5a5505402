//! Reciprocal Rank Fusion: `score = Σ weight_list / (k + rank)`.
//!
//! Combines ranked lists from different retrieval methods without
//! normalizing their native scores against each other. Each fused hit
//! remembers the source whose contribution was largest.

use std::collections::HashMap;

use engram_core::models::SearchSource;

/// One ranked input list. Items are `(chunk_id, native_score)` in rank
/// order, best first; the native score is kept only for callers that
/// bypass fusion when a single list remains.
#[derive(Debug, Clone)]
pub struct RankedList {
    pub source: SearchSource,
    pub weight: f64,
    pub items: Vec<(String, f64)>,
}

/// A fused candidate.
#[derive(Debug, Clone)]
pub struct FusedHit {
    pub id: String,
    /// Fused RRF score (higher = more relevant).
    pub score: f64,
    /// The list that contributed most of the score.
    pub source: SearchSource,
}

/// Fuse ranked lists. `k` is the smoothing constant (default 60):
/// higher k flattens the advantage of top ranks within any single list.
///
/// Output is sorted by fused score descending, ties by id ascending for
/// determinism.
pub fn fuse(lists: &[RankedList], k: u32) -> Vec<FusedHit> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut top_contribution: HashMap<String, (f64, SearchSource)> = HashMap::new();

    for list in lists {
        for (rank, (id, _)) in list.items.iter().enumerate() {
            let rrf = list.weight / (k as f64 + rank as f64 + 1.0);
            *scores.entry(id.clone()).or_default() += rrf;
            let entry = top_contribution
                .entry(id.clone())
                .or_insert((rrf, list.source));
            if rrf > entry.0 {
                *entry = (rrf, list.source);
            }
        }
    }

    let mut hits: Vec<FusedHit> = scores
        .into_iter()
        .map(|(id, score)| {
            let source = top_contribution
                .get(&id)
                .map(|(_, s)| *s)
                .unwrap_or(SearchSource::Vector);
            FusedHit { id, score, source }
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits
}
