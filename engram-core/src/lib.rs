//! # engram-core
//!
//! Foundation crate for the Engram episodic memory engine.
//! Defines all types, traits, errors, config, and codecs.
//! Every other crate in the workspace depends on this.

pub mod clock;
pub mod codec;
pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use clock::{ClockOrdering, VectorClock};
pub use config::EngramConfig;
pub use errors::{EngramError, EngramResult};
pub use models::{Chunk, Cluster, Direction, Edge, EdgeType, ReferenceType};
