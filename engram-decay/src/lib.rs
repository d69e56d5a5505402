//! # engram-decay
//!
//! Edge weights decay as the project's vector clock advances past the
//! clock stamped on the edge. The curve depends on traversal direction:
//! recall (backward) forgets quickly, predict (forward) holds steady for
//! a few hops first. Edges that predate vector clocks decay on
//! wall-clock age instead.

pub mod curves;
pub mod engine;

pub use curves::{DecayCurve, Tier};
pub use engine::DecayEngine;
