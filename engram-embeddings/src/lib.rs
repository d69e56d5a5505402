//! # engram-embeddings
//!
//! The process-wide embedder handle and the embedding cache in front of
//! it. The model itself is an external collaborator behind
//! [`engram_core::traits::IEmbedder`]; this crate owns its lifecycle
//! (lazy init, serialized inference, dispose) and keeps embeddings from
//! being recomputed: an L1 in-memory LRU backed by the persistent
//! `embedding_cache` table.

pub mod cache;
pub mod shared;

pub use cache::CachedEmbedder;
pub use shared::SharedEmbedder;
