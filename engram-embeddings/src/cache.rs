//! Two-tier embedding cache in front of the shared embedder.
//!
//! L1 is an in-memory LRU keyed by `model_id:content_hash`; L2 is the
//! persistent `embedding_cache` table behind
//! [`engram_core::traits::IEmbeddingCacheStore`]. Only document text is
//! cached: queries are one-shot and skip both tiers.

use std::sync::Arc;

use engram_core::codec::content_hash;
use engram_core::errors::EngramResult;
use engram_core::traits::IEmbeddingCacheStore;

use crate::shared::SharedEmbedder;

/// L1 capacity. Small: it only has to absorb one ingest run's worth of
/// repeated lookups.
const L1_CAPACITY: u64 = 4_096;

/// Caching wrapper around the shared embedder.
pub struct CachedEmbedder {
    embedder: SharedEmbedder,
    store: Arc<dyn IEmbeddingCacheStore>,
    l1: moka::sync::Cache<String, Arc<Vec<f32>>>,
    /// L2 row bound, enforced by the store on every write batch.
    max_entries: usize,
}

impl CachedEmbedder {
    pub fn new(
        embedder: SharedEmbedder,
        store: Arc<dyn IEmbeddingCacheStore>,
        max_entries: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            l1: moka::sync::Cache::new(L1_CAPACITY),
            max_entries,
        }
    }

    pub fn embedder(&self) -> &SharedEmbedder {
        &self.embedder
    }

    /// Embed a query. Uncached.
    pub fn embed_query(&self, text: &str) -> EngramResult<Vec<f32>> {
        self.embedder.embed(text, true)
    }

    /// Embed document texts, consulting both cache tiers and batching
    /// only the misses through the model. The result is parallel to
    /// `texts`.
    pub fn embed_documents(
        &self,
        texts: &[String],
        batch_size: usize,
    ) -> EngramResult<Vec<Vec<f32>>> {
        let model_id = self.embedder.model_id()?;
        let hashes: Vec<String> = texts.iter().map(|t| content_hash(t)).collect();

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

        // L1.
        let mut l2_lookup_indices = Vec::new();
        for (i, hash) in hashes.iter().enumerate() {
            match self.l1.get(&l1_key(&model_id, hash)) {
                Some(hit) => results[i] = Some(hit.as_ref().clone()),
                None => l2_lookup_indices.push(i),
            }
        }

        // L2.
        let mut miss_indices = Vec::new();
        if !l2_lookup_indices.is_empty() {
            let l2_hashes: Vec<String> = l2_lookup_indices
                .iter()
                .map(|&i| hashes[i].clone())
                .collect();
            let l2_hits = self.store.cache_get_batch(&l2_hashes, &model_id)?;
            for (&i, hit) in l2_lookup_indices.iter().zip(l2_hits.into_iter()) {
                match hit {
                    Some(vector) => {
                        self.l1
                            .insert(l1_key(&model_id, &hashes[i]), Arc::new(vector.clone()));
                        results[i] = Some(vector);
                    }
                    None => miss_indices.push(i),
                }
            }
        }

        // Model, misses only, true batching.
        if !miss_indices.is_empty() {
            let miss_texts: Vec<String> =
                miss_indices.iter().map(|&i| texts[i].clone()).collect();
            let embedded = self.embedder.embed_batch(&miss_texts, false, batch_size)?;

            let mut write_back = Vec::with_capacity(embedded.len());
            for (&i, vector) in miss_indices.iter().zip(embedded.into_iter()) {
                write_back.push((hashes[i].clone(), vector.clone()));
                self.l1
                    .insert(l1_key(&model_id, &hashes[i]), Arc::new(vector.clone()));
                results[i] = Some(vector);
            }
            self.store
                .cache_put_batch(&write_back, &model_id, self.max_entries)?;
            tracing::debug!(
                total = texts.len(),
                embedded = write_back.len(),
                "embedded cache misses"
            );
        }

        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }
}

fn l1_key(model_id: &str, hash: &str) -> String {
    format!("{model_id}:{hash}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_storage::StorageEngine;
    use test_fixtures::HashEmbedder;

    fn cached(engine: Arc<StorageEngine>) -> (CachedEmbedder, Arc<HashEmbedder>) {
        let model = Arc::new(HashEmbedder::new(8));
        let shared = SharedEmbedder::new();
        shared.install(model.clone());
        (CachedEmbedder::new(shared, engine, 100), model)
    }

    #[test]
    fn repeated_texts_hit_the_cache() {
        let engine = Arc::new(StorageEngine::open_in_memory().unwrap());
        let (cached, model) = cached(engine);

        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let first = cached.embed_documents(&texts, 4).unwrap();
        assert_eq!(model.calls(), 2);

        let second = cached.embed_documents(&texts, 4).unwrap();
        assert_eq!(model.calls(), 2, "second pass must be all cache hits");
        assert_eq!(first, second);
    }

    #[test]
    fn l2_survives_a_fresh_l1() {
        let engine = Arc::new(StorageEngine::open_in_memory().unwrap());

        let (first, model) = cached(engine.clone());
        first
            .embed_documents(&["persist me".to_string()], 4)
            .unwrap();
        assert_eq!(model.calls(), 1);

        // New CachedEmbedder, same store: L1 is cold, L2 is warm.
        let (second, model2) = cached(engine);
        second
            .embed_documents(&["persist me".to_string()], 4)
            .unwrap();
        assert_eq!(model2.calls(), 0);
    }

    #[test]
    fn queries_bypass_the_cache() {
        let engine = Arc::new(StorageEngine::open_in_memory().unwrap());
        let (cached, model) = cached(engine);
        cached.embed_query("q").unwrap();
        cached.embed_query("q").unwrap();
        assert_eq!(model.calls(), 2);
    }
}
