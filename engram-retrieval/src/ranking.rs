//! Recency boosting and Maximal Marginal Relevance reordering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use engram_core::codec::cosine_similarity;
use engram_core::config::RetrievalConfig;
use engram_core::constants::SESSION_BOOST;
use engram_core::models::Chunk;

/// Exponential recency boost:
/// `score ×= 1 + decay_factor · exp(−age_hours · ln2 / half_life)`.
/// Chunks of the caller's current session get an extra ×1.2.
pub fn recency_boost(
    score: f64,
    chunk: &Chunk,
    now: DateTime<Utc>,
    current_session: Option<&str>,
    config: &RetrievalConfig,
) -> f64 {
    let age_hours = (now - chunk.end_time).num_seconds().max(0) as f64 / 3600.0;
    let freshness =
        (-age_hours * std::f64::consts::LN_2 / config.recency_half_life_hours).exp();
    let mut boosted = score * (1.0 + config.recency_decay_factor * freshness);
    if current_session.is_some_and(|s| s == chunk.session_id) {
        boosted *= SESSION_BOOST;
    }
    boosted
}

/// Greedy MMR: repeatedly pick the candidate maximizing
/// `λ·relevance − (1−λ)·max_similarity_to_selected`, using angular
/// similarity on stored vectors. Candidates without a vector fall back
/// to zero similarity (pure relevance ordering among themselves).
///
/// Returns ids in selection order, `min(candidates.len(), k)` of them.
pub fn mmr_rerank(
    candidates: &[(String, f64)],
    vectors: &HashMap<String, Vec<f32>>,
    lambda: f64,
    k: usize,
) -> Vec<String> {
    let mut remaining: Vec<(String, f64)> = candidates.to_vec();
    let mut selected: Vec<String> = Vec::new();
    let target = k.min(remaining.len());

    while selected.len() < target {
        let mut best_index = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, (id, relevance)) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .filter_map(|s| {
                    let a = vectors.get(id)?;
                    let b = vectors.get(s)?;
                    Some(cosine_similarity(a, b))
                })
                .fold(f64::NEG_INFINITY, f64::max);
            let redundancy = if redundancy.is_finite() { redundancy } else { 0.0 };
            let value = lambda * relevance - (1.0 - lambda) * redundancy;
            if value > best_value {
                best_value = value;
                best_index = i;
            }
        }
        selected.push(remaining.remove(best_index).0);
    }
    selected
}
