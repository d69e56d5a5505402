//! Process-wide embedder handle.
//!
//! The inner model is not concurrency-safe, so every inference call
//! holds the mutex, even across callers. The mutex never escapes this
//! type.

use std::sync::{Arc, Mutex};

use engram_core::errors::{EngramResult, RetrievalError};
use engram_core::traits::IEmbedder;

/// Serializes access to one embedder instance. Cheap to clone.
#[derive(Clone)]
pub struct SharedEmbedder {
    inner: Arc<Mutex<Option<Arc<dyn IEmbedder>>>>,
}

impl SharedEmbedder {
    /// An empty handle; the model loads on `install`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Install the embedder. Replaces any previous instance.
    pub fn install(&self, embedder: Arc<dyn IEmbedder>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(embedder);
    }

    /// Whether a model is currently installed.
    pub fn is_loaded(&self) -> bool {
        self.inner
            .lock()
            .map(|g| g.is_some())
            .unwrap_or(false)
    }

    /// Embed one text under the inference lock.
    pub fn embed(&self, text: &str, is_query: bool) -> EngramResult<Vec<f32>> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let embedder = guard.as_ref().ok_or(RetrievalError::NoEmbedder)?;
        embedder.embed(text, is_query)
    }

    /// Embed a batch under the inference lock.
    pub fn embed_batch(
        &self,
        texts: &[String],
        is_query: bool,
        batch_size: usize,
    ) -> EngramResult<Vec<Vec<f32>>> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let embedder = guard.as_ref().ok_or(RetrievalError::NoEmbedder)?;
        embedder.embed_batch(texts, is_query, batch_size)
    }

    /// Output dimensionality of the installed model.
    pub fn dim(&self) -> EngramResult<usize> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let embedder = guard.as_ref().ok_or(RetrievalError::NoEmbedder)?;
        Ok(embedder.dim())
    }

    /// Cache-key model id of the installed model.
    pub fn model_id(&self) -> EngramResult<String> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let embedder = guard.as_ref().ok_or(RetrievalError::NoEmbedder)?;
        Ok(embedder.model_id().to_string())
    }

    /// Dispose the model and drop the instance. Later calls fail with
    /// `NO_EMBEDDER` until a new install.
    pub fn dispose(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(embedder) = guard.take() {
            embedder.dispose();
            tracing::debug!("embedder disposed");
        }
    }
}

impl Default for SharedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}
