//! Export/import archives.
//!
//! An archive is a JSON-lines stream: one manifest line, then one line
//! per chunk, edge, cluster, assignment, and (optionally) vector. The
//! stream may be gzip-compressed and may be sealed under a
//! password-derived authenticated cipher. Import replays the stream in
//! dependency order inside write transactions.

pub mod crypto;

use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use engram_core::config::CipherKind;
use engram_core::errors::{EngramResult, StorageError};
use engram_core::models::{Chunk, Cluster, ClusterAssignment, Edge};
use engram_core::traits::{IClusterStore, IMemoryStore};

use crate::StorageEngine;

/// Archive format version.
const ARCHIVE_VERSION: u32 = 1;

fn archive_err(reason: impl Into<String>) -> engram_core::errors::EngramError {
    StorageError::ArchiveFailed {
        reason: reason.into(),
    }
    .into()
}

/// Export options.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub include_vectors: bool,
    pub compress: bool,
    /// Seal the archive under this password.
    pub password: Option<String>,
    pub cipher: CipherKind,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            include_vectors: true,
            compress: true,
            password: None,
            cipher: CipherKind::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    chunk_count: usize,
    edge_count: usize,
    cluster_count: usize,
    includes_vectors: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record {
    Chunk(Chunk),
    Edge(Edge),
    Cluster(Cluster),
    Assignment(ClusterAssignment),
    Vector {
        chunk_id: String,
        project_slug: String,
        embedding: Vec<f32>,
    },
}

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportStats {
    pub chunks: usize,
    pub edges: usize,
    pub clusters: usize,
    pub vectors: usize,
}

/// Export the full store to an archive file.
pub fn export_archive(
    engine: &StorageEngine,
    path: &Path,
    options: &ArchiveOptions,
) -> EngramResult<()> {
    let mut lines = Vec::new();

    let chunks = engine.all_chunks()?;
    let mut edges = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let batch = engine.edge_batch(after.as_deref(), 500)?;
        if batch.is_empty() {
            break;
        }
        after = batch.last().map(|e| e.id.clone());
        edges.extend(batch);
    }

    let clusters = engine.all_clusters()?;
    let manifest = Manifest {
        version: ARCHIVE_VERSION,
        chunk_count: chunks.len(),
        edge_count: edges.len(),
        cluster_count: clusters.len(),
        includes_vectors: options.include_vectors,
    };
    lines.push(serde_json::to_string(&manifest).map_err(|e| archive_err(e.to_string()))?);

    for chunk in &chunks {
        push_record(&mut lines, &Record::Chunk(chunk.clone()))?;
    }
    for edge in edges {
        push_record(&mut lines, &Record::Edge(edge))?;
    }
    for cluster in &clusters {
        push_record(&mut lines, &Record::Cluster(cluster.clone()))?;
        for assignment in engine.cluster_members(&cluster.id)? {
            push_record(&mut lines, &Record::Assignment(assignment))?;
        }
    }
    if options.include_vectors {
        for (chunk_id, embedding) in engine.all_vectors()? {
            let project_slug = chunks
                .iter()
                .find(|c| c.id == chunk_id)
                .map(|c| c.project_slug.clone())
                .unwrap_or_default();
            push_record(
                &mut lines,
                &Record::Vector {
                    chunk_id,
                    project_slug,
                    embedding,
                },
            )?;
        }
    }

    let mut bytes = lines.join("\n").into_bytes();
    if options.compress {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&bytes)
            .map_err(|e| archive_err(e.to_string()))?;
        bytes = encoder.finish().map_err(|e| archive_err(e.to_string()))?;
    }
    if let Some(password) = &options.password {
        bytes = crypto::seal(&bytes, password, options.cipher)?;
    }

    std::fs::write(path, bytes).map_err(|e| archive_err(e.to_string()))?;
    tracing::info!(
        path = %path.display(),
        chunks = manifest.chunk_count,
        edges = manifest.edge_count,
        "archive exported"
    );
    Ok(())
}

fn push_record(lines: &mut Vec<String>, record: &Record) -> EngramResult<()> {
    lines.push(serde_json::to_string(record).map_err(|e| archive_err(e.to_string()))?);
    Ok(())
}

/// Import an archive file. Records land in dependency order: chunks,
/// then vectors, edges, clusters, assignments.
pub fn import_archive(
    engine: &StorageEngine,
    path: &Path,
    password: Option<&str>,
) -> EngramResult<ImportStats> {
    let mut bytes = std::fs::read(path).map_err(|e| archive_err(e.to_string()))?;
    if crypto::is_sealed(&bytes) {
        let password = password.ok_or_else(|| archive_err("archive is encrypted"))?;
        bytes = crypto::open(&bytes, password)?;
    }
    // Gzip magic.
    if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| archive_err(e.to_string()))?;
        bytes = out;
    }
    let text = String::from_utf8(bytes).map_err(|e| archive_err(e.to_string()))?;
    let mut lines = text.lines();

    let manifest: Manifest = serde_json::from_str(
        lines
            .next()
            .ok_or_else(|| archive_err("empty archive"))?,
    )
    .map_err(|e| archive_err(format!("bad manifest: {e}")))?;
    if manifest.version != ARCHIVE_VERSION {
        return Err(archive_err(format!(
            "unsupported archive version {}",
            manifest.version
        )));
    }

    let mut chunks = Vec::new();
    let mut edges = Vec::new();
    let mut clusters = Vec::new();
    let mut assignments: Vec<ClusterAssignment> = Vec::new();
    let mut vectors = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let record: Record =
            serde_json::from_str(line).map_err(|e| archive_err(format!("bad record: {e}")))?;
        match record {
            Record::Chunk(c) => chunks.push(c),
            Record::Edge(e) => edges.push(e),
            Record::Cluster(c) => clusters.push(c),
            Record::Assignment(a) => assignments.push(a),
            Record::Vector {
                chunk_id,
                project_slug,
                embedding,
            } => vectors.push((chunk_id, project_slug, embedding)),
        }
    }

    let stats = ImportStats {
        chunks: chunks.len(),
        edges: edges.len(),
        clusters: clusters.len(),
        vectors: vectors.len(),
    };

    engine.insert_chunks(&chunks)?;
    for (chunk_id, project_slug, embedding) in &vectors {
        engine.insert_vector(chunk_id, project_slug, embedding)?;
    }
    engine.create_or_boost_edges(&edges)?;
    for cluster in &clusters {
        let members: Vec<ClusterAssignment> = assignments
            .iter()
            .filter(|a| a.cluster_id == cluster.id)
            .cloned()
            .collect();
        engine.replace_cluster(cluster, &members)?;
    }

    tracing::info!(
        chunks = stats.chunks,
        edges = stats.edges,
        clusters = stats.clusters,
        "archive imported"
    );
    Ok(stats)
}
