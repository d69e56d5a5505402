//! # engram-ingest
//!
//! Turns a parsed transcript into persistent chunks, vectors, and
//! edges: render turns with structural markers, merge/split into
//! token-bounded chunks, embed through the cache, detect transitions,
//! stamp everything with vector clocks, and commit atomically.

pub mod chunking;
pub mod edges;
pub mod orchestrator;

pub use orchestrator::IngestOrchestrator;
