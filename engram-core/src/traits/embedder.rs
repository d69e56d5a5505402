use crate::errors::EngramResult;

/// The embedding model, consumed as a black box.
///
/// Implementations map text to unit-norm vectors of a fixed dimension,
/// applying any document/query prefix their model card requires. The
/// inner model is typically not concurrency-safe; the engine serializes
/// calls through a process-wide handle.
pub trait IEmbedder: Send + Sync {
    /// Embed one text. `is_query` selects the query-side prefix.
    fn embed(&self, text: &str, is_query: bool) -> EngramResult<Vec<f32>>;

    /// Embed a batch with true batched inference. `batch_size` bounds
    /// attention memory per forward pass.
    fn embed_batch(
        &self,
        texts: &[String],
        is_query: bool,
        batch_size: usize,
    ) -> EngramResult<Vec<Vec<f32>>>;

    /// Output dimensionality.
    fn dim(&self) -> usize;

    /// Stable model identifier; part of the embedding cache key.
    fn model_id(&self) -> &str;

    /// Release model resources. Idempotent.
    fn dispose(&self) {}
}
