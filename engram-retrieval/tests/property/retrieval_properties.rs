use std::collections::HashMap;

use engram_core::models::SearchSource;
use engram_retrieval::ranking::mmr_rerank;
use engram_retrieval::{fuse, RankedList};
use proptest::prelude::*;

fn arb_ids() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-f][0-9]", 1..12).prop_map(|mut ids| {
        ids.sort();
        ids.dedup();
        ids
    })
}

fn list(source: SearchSource, weight: f64, ids: Vec<String>) -> RankedList {
    RankedList {
        source,
        weight,
        items: ids.into_iter().map(|id| (id, 1.0)).collect(),
    }
}

fn score_map(hits: &[engram_retrieval::FusedHit]) -> HashMap<String, f64> {
    hits.iter().map(|h| (h.id.clone(), h.score)).collect()
}

// ── RRF rank monotonicity ────────────────────────────────────────────────

proptest! {
    // Dropping the lowest-ranked item of a list shifts no other rank,
    // so every other fused score is exactly unchanged.
    #[test]
    fn dropping_the_tail_changes_no_other_score(
        vector_ids in arb_ids(),
        keyword_ids in arb_ids(),
        w_v in 0.1f64..1.0,
        w_k in 0.1f64..1.0,
    ) {
        let vector = list(SearchSource::Vector, w_v, vector_ids.clone());
        let keyword = list(SearchSource::Keyword, w_k, keyword_ids);
        let before = score_map(&fuse(&[vector.clone(), keyword.clone()], 60));

        let mut trimmed = vector.clone();
        let dropped = trimmed.items.pop().map(|(id, _)| id);
        let after = score_map(&fuse(&[trimmed, keyword], 60));

        for (id, score) in &after {
            if Some(id) == dropped.as_ref() {
                continue;
            }
            let old = before.get(id).copied().unwrap_or(0.0);
            prop_assert!((score - old).abs() < 1e-12, "{id}: {old} -> {score}");
        }
    }

    // Removing any item can only promote survivors: no fused score
    // ever drops.
    #[test]
    fn removal_never_lowers_a_survivor(
        vector_ids in arb_ids(),
        keyword_ids in arb_ids(),
        removal_seed in 0usize..16,
    ) {
        let vector = list(SearchSource::Vector, 0.7, vector_ids.clone());
        let keyword = list(SearchSource::Keyword, 0.3, keyword_ids);
        let before = score_map(&fuse(&[vector.clone(), keyword.clone()], 60));

        let index = removal_seed % vector.items.len();
        let mut trimmed = vector.clone();
        let (removed, _) = trimmed.items.remove(index);
        let after = score_map(&fuse(&[trimmed, keyword], 60));

        for (id, score) in &after {
            if *id == removed {
                continue;
            }
            let old = before.get(id).copied().unwrap_or(0.0);
            prop_assert!(*score >= old - 1e-12, "{id} dropped: {old} -> {score}");
        }
    }

    // An item present in both lists outscores the same item in either
    // list alone.
    #[test]
    fn presence_in_more_lists_raises_the_score(
        ids in arb_ids(),
        w_v in 0.1f64..1.0,
        w_k in 0.1f64..1.0,
    ) {
        let shared = ids[0].clone();
        let vector = list(SearchSource::Vector, w_v, ids.clone());
        let keyword = list(SearchSource::Keyword, w_k, vec![shared.clone()]);

        let alone = score_map(&fuse(&[vector.clone()], 60));
        let both = score_map(&fuse(&[vector, keyword], 60));
        prop_assert!(both[&shared] > alone[&shared]);
    }
}

// ── MMR output budget ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn mmr_output_length_and_first_pick(
        relevances in proptest::collection::vec(0.0f64..1.0, 0..20),
        k in 0usize..25,
        lambda in 0.01f64..=1.0,
    ) {
        let candidates: Vec<(String, f64)> = relevances
            .iter()
            .enumerate()
            .map(|(i, &r)| (format!("c{i:02}"), r))
            .collect();
        let vectors = HashMap::new();

        let order = mmr_rerank(&candidates, &vectors, lambda, k);
        prop_assert_eq!(order.len(), k.min(candidates.len()));

        // No vectors means zero redundancy everywhere: pure relevance
        // ordering, so the first pick is the most relevant candidate.
        if !order.is_empty() {
            // First index with the maximum relevance (ties keep the
            // earlier candidate, matching the greedy scan).
            let best = candidates
                .iter()
                .enumerate()
                .fold(0, |best, (i, c)| {
                    if c.1 > candidates[best].1 { i } else { best }
                });
            prop_assert_eq!(&order[0], &candidates[best].0);
        }

        // Output contains no duplicates.
        let mut dedup = order.clone();
        dedup.sort();
        dedup.dedup();
        prop_assert_eq!(dedup.len(), order.len());
    }
}
