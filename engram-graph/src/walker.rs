//! Chain walker: seed-driven directed traversal that reconstructs
//! ordered narratives.
//!
//! From each seed the walk repeatedly follows the best live edge in the
//! requested direction (initial weight descending, edge id ascending)
//! to an unvisited neighbour. One visited set spans all seeds so chains
//! never overlap. Chunks filtered out by agent are traversed but not
//! emitted; too many consecutive skips abandon the branch.

use std::collections::HashSet;
use std::sync::Arc;

use engram_core::codec::cosine_similarity;
use engram_core::errors::EngramResult;
use engram_core::models::{Chunk, Direction};
use engram_core::traits::IMemoryStore;

/// Traversal options. Defaults mirror the retrieval configuration.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub direction: Direction,
    pub token_budget: usize,
    pub max_depth: usize,
    pub agent_filter: Option<String>,
    pub max_skipped_consecutive: usize,
}

impl WalkOptions {
    pub fn new(direction: Direction, token_budget: usize) -> Self {
        Self {
            direction,
            token_budget,
            max_depth: engram_core::constants::DEFAULT_MAX_WALK_DEPTH,
            agent_filter: None,
            max_skipped_consecutive: engram_core::constants::DEFAULT_MAX_SKIPPED_CONSECUTIVE,
        }
    }
}

/// One walked chain: emitted chunks in traversal order with their
/// query-similarity scores.
#[derive(Debug, Clone)]
pub struct WalkedChain {
    pub seed_id: String,
    pub chunks: Vec<Chunk>,
    pub scores: Vec<f64>,
    pub token_count: usize,
}

impl WalkedChain {
    /// Median per-node similarity; chains under two nodes do not
    /// qualify for best-chain selection.
    pub fn median_score(&self) -> Option<f64> {
        if self.scores.len() < 2 {
            return None;
        }
        let mut sorted = self.scores.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = sorted.len() / 2;
        Some(if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        })
    }
}

/// Result of walking all seeds.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    pub chains: Vec<WalkedChain>,
    /// Dead edge ids observed on the way; hand these to the pruner.
    pub dead_edge_ids: Vec<String>,
}

pub struct ChainWalker {
    store: Arc<dyn IMemoryStore>,
}

impl ChainWalker {
    pub fn new(store: Arc<dyn IMemoryStore>) -> Self {
        Self { store }
    }

    /// Walk one chain per seed. Seeds are processed in the given order
    /// and share one visited set.
    pub fn walk_chains(
        &self,
        seed_ids: &[String],
        query_embedding: &[f32],
        options: &WalkOptions,
    ) -> EngramResult<WalkOutcome> {
        let mut outcome = WalkOutcome::default();
        let mut visited: HashSet<String> = HashSet::new();

        for seed_id in seed_ids {
            if visited.contains(seed_id) {
                continue;
            }
            let chain =
                self.walk_one(seed_id, query_embedding, options, &mut visited, &mut outcome)?;
            if let Some(chain) = chain {
                outcome.chains.push(chain);
            }
        }
        Ok(outcome)
    }

    fn walk_one(
        &self,
        seed_id: &str,
        query_embedding: &[f32],
        options: &WalkOptions,
        visited: &mut HashSet<String>,
        outcome: &mut WalkOutcome,
    ) -> EngramResult<Option<WalkedChain>> {
        let Some(seed) = self.store.get_chunk(seed_id)? else {
            return Ok(None);
        };

        let mut chain = WalkedChain {
            seed_id: seed_id.to_string(),
            chunks: Vec::new(),
            scores: Vec::new(),
            token_count: 0,
        };
        let mut consecutive_skips = 0usize;
        let mut depth = 0usize;
        let mut current = seed;

        loop {
            visited.insert(current.id.clone());

            let emit = options
                .agent_filter
                .as_ref()
                .map(|agent| current.agent_id.as_deref() == Some(agent.as_str()))
                .unwrap_or(true);

            if emit {
                if chain.token_count + current.approx_tokens as usize > options.token_budget
                    && !chain.chunks.is_empty()
                {
                    break;
                }
                consecutive_skips = 0;
                chain.token_count += current.approx_tokens as usize;
                chain.scores.push(self.score(&current, query_embedding)?);
                chain.chunks.push(current.clone());
            } else {
                consecutive_skips += 1;
                if consecutive_skips > options.max_skipped_consecutive {
                    break;
                }
            }

            if depth >= options.max_depth {
                break;
            }

            let ref_clock = self.store.project_clock(&current.project_slug)?;
            let edges = self
                .store
                .weighted_edges(&current.id, options.direction, &ref_clock)?;
            outcome.dead_edge_ids.extend(edges.dead_ids);

            // Best-first order is the store's contract; take the first
            // unvisited neighbour (whichever endpoint is not us).
            let next_id = edges.live.iter().find_map(|weighted| {
                let edge = &weighted.edge;
                let neighbour = if edge.source_chunk_id == current.id {
                    &edge.target_chunk_id
                } else {
                    &edge.source_chunk_id
                };
                (!visited.contains(neighbour)).then(|| neighbour.clone())
            });

            let Some(next_id) = next_id else {
                break;
            };
            let Some(next) = self.store.get_chunk(&next_id)? else {
                break;
            };
            depth += 1;
            current = next;
        }

        Ok((!chain.chunks.is_empty()).then_some(chain))
    }

    fn score(&self, chunk: &Chunk, query_embedding: &[f32]) -> EngramResult<f64> {
        Ok(self
            .store
            .get_vector(&chunk.id)?
            .map(|v| cosine_similarity(query_embedding, &v))
            .unwrap_or(0.0))
    }
}

/// Pick the chain with the highest median similarity among chains of
/// length ≥ 2. Earlier seed order wins ties.
pub fn best_chain(chains: &[WalkedChain]) -> Option<&WalkedChain> {
    let mut best: Option<(&WalkedChain, f64)> = None;
    for chain in chains {
        let Some(median) = chain.median_score() else {
            continue;
        };
        match best {
            Some((_, best_median)) if median <= best_median => {}
            _ => best = Some((chain, median)),
        }
    }
    best.map(|(chain, _)| chain)
}

/// Render a chain as a narrative. Backward chains are reversed into
/// chronological problem → solution order; forward chains keep
/// traversal order.
pub fn format_narrative(chain: &WalkedChain, direction: Direction) -> String {
    let ordered: Vec<&Chunk> = match direction {
        Direction::Backward => chain.chunks.iter().rev().collect(),
        Direction::Forward => chain.chunks.iter().collect(),
    };
    let total = ordered.len();
    let mut out = String::new();
    for (i, chunk) in ordered.iter().enumerate() {
        out.push_str(&format!(
            "[{}/{} | Session: {} | Date: {}]\n{}\n\n",
            i + 1,
            total,
            chunk.project_slug,
            chunk.start_time.format("%Y-%m-%d"),
            chunk.content.trim_end()
        ));
    }
    out.trim_end().to_string()
}
