//! # engram-cluster
//!
//! Density-based clustering over stored chunk vectors. The HDBSCAN
//! implementation lives in [`hdbscan`]; [`manager`] runs it against the
//! vector store and persists clusters, assignments, and membership
//! hashes.

pub mod hdbscan;
pub mod manager;

pub use hdbscan::{Hdbscan, HdbscanOptions, HdbscanResult};
pub use manager::ClusterManager;
