//! The hybrid search pipeline.
//!
//! embed → vector + keyword (concurrent) → RRF fuse → cluster expand →
//! dedupe/seed → recency boost → MMR → budget-bounded assembly. The
//! cancel flag is checked after every stage; a cancelled query returns
//! `QUERY_TIMEOUT` and no partial response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use engram_core::codec::approx_tokens;
use engram_core::config::RetrievalConfig;
use engram_core::constants::ASSEMBLY_TOKEN_SLACK;
use engram_core::errors::{EngramResult, RetrievalError};
use engram_core::models::{
    Chunk, ScoredChunk, SearchFilter, SearchRequest, SearchResponse, SearchSource,
};
use engram_core::traits::{IClusterStore, IMemoryStore};
use engram_embeddings::CachedEmbedder;

use crate::cancel::CancelFlag;
use crate::expansion::expand_clusters;
use crate::fusion::{fuse, FusedHit, RankedList};
use crate::ranking::{mmr_rerank, recency_boost};

pub struct SearchAssembler<S> {
    store: Arc<S>,
    embedder: Arc<CachedEmbedder>,
    config: RetrievalConfig,
}

impl<S> SearchAssembler<S>
where
    S: IMemoryStore + IClusterStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, embedder: Arc<CachedEmbedder>, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run the full pipeline for one query.
    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancelFlag,
    ) -> EngramResult<SearchResponse> {
        let started = Instant::now();
        let filter = SearchFilter {
            projects: request.project_filter.iter().cloned().collect(),
            agent_id: request.agent_filter.clone(),
        };

        // Stage 1: embed the query.
        let query_embedding = self.embedder.embed_query(&request.query)?;
        cancel.check(started)?;

        // Stages 2a/2b: vector and keyword search, concurrently.
        let (vector_hits, keyword_hits) = {
            let store_v = Arc::clone(&self.store);
            let store_k = Arc::clone(&self.store);
            let embedding = query_embedding.clone();
            let query = request.query.clone();
            let filter_v = filter.clone();
            let filter_k = filter.clone();
            let top_n = self.config.vector_top_n;
            let top_m = self.config.keyword_top_m;
            let vector_task = tokio::task::spawn_blocking(move || {
                store_v.search_vectors(&embedding, top_n, &filter_v)
            });
            let keyword_task = tokio::task::spawn_blocking(move || {
                store_k.search_keyword(&query, top_m, &filter_k)
            });
            let (vector, keyword) = tokio::join!(vector_task, keyword_task);
            let vector = vector.map_err(|e| RetrievalError::VectorSearchFailed {
                reason: e.to_string(),
            })??;
            let keyword = keyword.map_err(|e| RetrievalError::VectorSearchFailed {
                reason: e.to_string(),
            })??;
            (vector, keyword)
        };
        cancel.check(started)?;

        // Stage 3: fuse. A single non-empty list passes through on its
        // native ranking.
        let vector_list = RankedList {
            source: SearchSource::Vector,
            weight: self.config.vector_weight,
            // Angular distance → similarity so the native score is
            // higher-is-better like the keyword side.
            items: vector_hits
                .into_iter()
                .map(|(id, distance)| (id, 1.0 - distance))
                .collect(),
        };
        let keyword_list = RankedList {
            source: SearchSource::Keyword,
            weight: self.config.keyword_weight,
            items: keyword_hits,
        };
        let mut hits: Vec<FusedHit> = match (
            vector_list.items.is_empty(),
            keyword_list.items.is_empty(),
        ) {
            (true, true) => Vec::new(),
            (false, true) => single_list_hits(&vector_list),
            (true, false) => single_list_hits(&keyword_list),
            (false, false) => fuse(&[vector_list, keyword_list], self.config.rrf_k),
        };
        cancel.check(started)?;

        // Stage 4: cluster expansion.
        if !request.skip_clusters {
            let siblings = expand_clusters(
                self.store.as_ref(),
                &hits,
                &filter,
                self.config.max_clusters,
                self.config.max_siblings,
            )?;
            hits.extend(siblings);
        }
        cancel.check(started)?;

        // Stage 5: dedupe (first occurrence wins) and pick seeds.
        let mut seen = std::collections::HashSet::new();
        hits.retain(|h| seen.insert(h.id.clone()));
        let total_considered = hits.len();
        let seed_ids: Vec<String> = hits
            .iter()
            .take(self.config.seed_count)
            .map(|h| h.id.clone())
            .collect();

        // Stage 6: recency boost, then re-sort.
        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let chunks: HashMap<String, Chunk> = self
            .store
            .get_chunks(&ids)?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        let now = Utc::now();
        for hit in hits.iter_mut() {
            if let Some(chunk) = chunks.get(&hit.id) {
                hit.score = recency_boost(
                    hit.score,
                    chunk,
                    now,
                    request.session_id.as_deref(),
                    &self.config,
                );
            }
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        cancel.check(started)?;

        // Stage 7: MMR reorder over the stored vectors. Relevance is
        // normalized to [0, 1] so λ trades it off against similarity on
        // a common scale.
        let vectors = self.store.get_vectors(&ids)?;
        let top_score = hits
            .first()
            .map(|h| h.score)
            .filter(|s| *s > 0.0)
            .unwrap_or(1.0);
        let candidates: Vec<(String, f64)> = hits
            .iter()
            .map(|h| (h.id.clone(), h.score / top_score))
            .collect();
        let order = mmr_rerank(
            &candidates,
            &vectors,
            self.config.mmr_lambda,
            candidates.len(),
        );
        let by_id: HashMap<String, FusedHit> =
            hits.into_iter().map(|h| (h.id.clone(), h)).collect();
        let reordered: Vec<FusedHit> = order
            .into_iter()
            .filter_map(|id| by_id.get(&id).cloned())
            .collect();
        cancel.check(started)?;

        // Stage 8: assemble within the token budget.
        let response = assemble(
            &reordered,
            &chunks,
            request.token_budget,
            total_considered,
            started,
            query_embedding,
            seed_ids,
        );
        tracing::info!(
            query = %request.query,
            considered = response.total_considered,
            returned = response.chunks.len(),
            tokens = response.token_count,
            duration_ms = response.duration_ms,
            "search complete"
        );
        Ok(response)
    }
}

fn single_list_hits(list: &RankedList) -> Vec<FusedHit> {
    list.items
        .iter()
        .map(|(id, score)| FusedHit {
            id: id.clone(),
            score: *score,
            source: list.source,
        })
        .collect()
}

/// Append chunks until the budget runs out. A chunk that would overrun
/// by more than the slack is cut at its last paragraph boundary before
/// the limit and marked truncated.
fn assemble(
    hits: &[FusedHit],
    chunks: &HashMap<String, Chunk>,
    token_budget: usize,
    total_considered: usize,
    started: Instant,
    query_embedding: Vec<f32>,
    seed_ids: Vec<String>,
) -> SearchResponse {
    let max_score = hits
        .iter()
        .map(|h| h.score)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut text = String::new();
    let mut token_count = 0usize;
    let mut returned: Vec<ScoredChunk> = Vec::new();

    for hit in hits {
        let Some(chunk) = chunks.get(&hit.id) else {
            continue;
        };
        let relevance_pct = if max_score > 0.0 {
            (hit.score / max_score * 100.0).round() as u32
        } else {
            0
        };
        let header = format!(
            "[Session: {} | Agent: {} | Date: {} | Relevance: {}%]\n",
            chunk.project_slug,
            chunk.agent_id.as_deref().unwrap_or("main"),
            chunk.start_time.format("%Y-%m-%d"),
            relevance_pct
        );
        let block = format!("{header}{}\n\n", chunk.content.trim_end());
        let block_tokens = approx_tokens(&block);

        if token_count + block_tokens <= token_budget + ASSEMBLY_TOKEN_SLACK {
            text.push_str(&block);
            token_count += block_tokens;
            returned.push(ScoredChunk {
                chunk: chunk.clone(),
                score: hit.score,
                source: hit.source,
            });
            continue;
        }

        // Too big for the slack: truncate at the last paragraph break
        // that still fits, then stop.
        let remaining_tokens = token_budget.saturating_sub(token_count);
        let budget_chars = remaining_tokens * engram_core::constants::CHARS_PER_TOKEN;
        if budget_chars > header.len() {
            let room = budget_chars - header.len();
            let body = &chunk.content[..floor_char_boundary(&chunk.content, room)];
            if let Some(cut) = body.rfind("\n\n") {
                let partial = format!("{header}{}\n…[truncated]\n\n", &body[..cut]);
                token_count += approx_tokens(&partial);
                text.push_str(&partial);
                returned.push(ScoredChunk {
                    chunk: chunk.clone(),
                    score: hit.score,
                    source: hit.source,
                });
            }
        }
        break;
    }

    SearchResponse {
        text: text.trim_end().to_string(),
        token_count,
        chunks: returned,
        total_considered,
        duration_ms: started.elapsed().as_millis() as u64,
        query_embedding,
        seed_ids,
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
