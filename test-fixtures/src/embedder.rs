//! Deterministic bag-of-words embedder.
//!
//! Each word hashes to a fixed pseudo-random direction; a text embeds to
//! the normalized sum of its word vectors. Texts sharing words land
//! close together, which is exactly the property retrieval tests need,
//! with no model on disk.

use std::sync::atomic::{AtomicUsize, Ordering};

use engram_core::codec::normalize;
use engram_core::errors::EngramResult;
use engram_core::traits::IEmbedder;

pub struct HashEmbedder {
    dim: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of texts embedded so far (cache-miss counter for tests).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dim];
        let mut any = false;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            any = true;
            let mut state = fnv1a(word.to_lowercase().as_bytes());
            for slot in sum.iter_mut() {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                // Map the top bits to [-1, 1).
                let unit = ((state >> 40) as f32 / (1u64 << 23) as f32) * 2.0 - 1.0;
                *slot += unit;
            }
        }
        if !any {
            sum[0] = 1.0;
        }
        normalize(&mut sum);
        sum
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl IEmbedder for HashEmbedder {
    fn embed(&self, text: &str, _is_query: bool) -> EngramResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.embed_text(text))
    }

    fn embed_batch(
        &self,
        texts: &[String],
        _is_query: bool,
        _batch_size: usize,
    ) -> EngramResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        "hash-embedder-test"
    }
}
