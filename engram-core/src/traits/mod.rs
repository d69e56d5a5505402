//! Capability traits at the system's seams.
//!
//! The engine depends on these narrow interfaces, never on concrete
//! collaborators: the embedding model, the secret store, and the
//! transcript parser all live on the far side. Storage traits let the
//! retrieval and graph layers run against in-memory doubles in tests.

mod embedder;
mod secret_store;
mod storage;
mod transcript;

pub use embedder::IEmbedder;
pub use secret_store::ISecretStore;
pub use storage::{IClusterStore, IEmbeddingCacheStore, IMemoryStore, WeightedEdgeSet};
pub use transcript::ITranscriptSource;
