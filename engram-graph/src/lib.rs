//! # engram-graph
//!
//! Operations over the persistent chunk graph: the pruner that reclaims
//! dead edges and orphaned chunks, and the chain walker that
//! reconstructs ordered narratives for episodic retrieval.

pub mod pruner;
pub mod walker;

pub use pruner::Pruner;
pub use walker::{best_chain, format_narrative, ChainWalker, WalkOptions, WalkOutcome, WalkedChain};
