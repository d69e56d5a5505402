//! Query modules, one per table family. All functions take a plain
//! `&Connection`; transactions are owned by the caller in `engine.rs`.

pub mod cache_ops;
pub mod chunk_ops;
pub mod clock_ops;
pub mod cluster_ops;
pub mod edge_ops;
pub mod keyword_search;
pub mod maintenance;
pub mod vector_ops;
