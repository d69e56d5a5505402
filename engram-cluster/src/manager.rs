//! Runs HDBSCAN over the stored vectors and persists the outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;

use engram_core::codec::{membership_hash, normalize};
use engram_core::config::ClusterConfig;
use engram_core::errors::{ClusterError, EngramResult};
use engram_core::models::{Cluster, ClusterAssignment, ReclusterResult};
use engram_core::traits::{IClusterStore, IMemoryStore};

use crate::hdbscan::distance::angular;
use crate::hdbscan::{Hdbscan, HdbscanOptions};

/// Reclusters the vector store and upserts clusters, assignments, and
/// membership hashes. Clusters whose member set is unchanged keep their
/// id (and with it their out-of-band name); the rest are replaced.
pub struct ClusterManager<S> {
    store: Arc<S>,
    config: ClusterConfig,
}

impl<S> ClusterManager<S>
where
    S: IMemoryStore + IClusterStore,
{
    pub fn new(store: Arc<S>, config: ClusterConfig) -> Self {
        Self { store, config }
    }

    /// Run one full reclustering pass.
    pub fn recluster(&self) -> EngramResult<ReclusterResult> {
        let vectors = self.store.all_vectors()?;
        if vectors.is_empty() {
            return Err(ClusterError::NoVectors.into());
        }
        let (chunk_ids, points): (Vec<String>, Vec<Vec<f32>>) = vectors.into_iter().unzip();

        // Previously unassigned chunks, to report reclaimed noise.
        let previously_assigned: HashSet<String> = self
            .store
            .assignments_for_chunks(&chunk_ids)?
            .into_iter()
            .map(|a| a.chunk_id)
            .collect();

        let result = Hdbscan::new(HdbscanOptions::from(&self.config)).run(&points)?;

        // Existing clusters by membership hash, for id reuse.
        let prior = self.store.all_clusters()?;
        let prior_by_hash: HashMap<String, String> = prior
            .iter()
            .filter_map(|c| c.membership_hash.clone().map(|h| (h, c.id.clone())))
            .collect();

        let mut members_by_label: HashMap<i32, Vec<usize>> = HashMap::new();
        for (index, &label) in result.labels.iter().enumerate() {
            if label >= 0 {
                members_by_label.entry(label).or_default().push(index);
            }
        }

        let mut kept_or_created: HashSet<String> = HashSet::new();
        let mut assigned_chunks = 0;
        let mut reassigned_noise = 0;

        let mut labels: Vec<i32> = members_by_label.keys().copied().collect();
        labels.sort_unstable();
        for label in labels {
            let member_indices = &members_by_label[&label];
            let member_ids: Vec<String> = member_indices
                .iter()
                .map(|&i| chunk_ids[i].clone())
                .collect();

            let mut centroid = vec![0.0f32; points[member_indices[0]].len()];
            for &i in member_indices {
                for (slot, value) in centroid.iter_mut().zip(points[i].iter()) {
                    *slot += value;
                }
            }
            let scale = 1.0 / member_indices.len() as f32;
            for slot in centroid.iter_mut() {
                *slot *= scale;
            }
            normalize(&mut centroid);

            let hash = membership_hash(&member_ids);
            let cluster_id = prior_by_hash
                .get(&hash)
                .cloned()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            kept_or_created.insert(cluster_id.clone());

            let exemplar_ids: Vec<String> = result
                .exemplars
                .get(label as usize)
                .map(|indices| indices.iter().map(|&i| chunk_ids[i].clone()).collect())
                .unwrap_or_default();

            let existing = self.store.get_cluster(&cluster_id)?;
            let cluster = Cluster {
                id: cluster_id.clone(),
                name: existing.as_ref().and_then(|c| c.name.clone()),
                description: existing.as_ref().and_then(|c| c.description.clone()),
                centroid: Some(centroid.clone()),
                exemplar_ids,
                membership_hash: Some(hash),
                created_at: existing.map(|c| c.created_at).unwrap_or_else(Utc::now),
                refreshed_at: None,
            };

            let assignments: Vec<ClusterAssignment> = member_indices
                .iter()
                .map(|&i| ClusterAssignment {
                    chunk_id: chunk_ids[i].clone(),
                    cluster_id: cluster_id.clone(),
                    distance: angular(&points[i], &centroid),
                })
                .collect();

            assigned_chunks += assignments.len();
            reassigned_noise += member_ids
                .iter()
                .filter(|id| !previously_assigned.contains(*id))
                .count();

            self.store.replace_cluster(&cluster, &assignments)?;
        }

        // Drop clusters that did not survive this run.
        for cluster in prior {
            if !kept_or_created.contains(&cluster.id) {
                self.store.delete_cluster(&cluster.id)?;
            }
        }

        let summary = ReclusterResult {
            num_clusters: result.num_clusters,
            assigned_chunks,
            reassigned_noise,
        };
        tracing::info!(
            clusters = summary.num_clusters,
            assigned = summary.assigned_chunks,
            reclaimed = summary.reassigned_noise,
            "recluster complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engram_core::clock::VectorClock;
    use engram_core::models::Chunk;
    use engram_storage::StorageEngine;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            session_id: "s".into(),
            project_slug: "p".into(),
            turn_indices: vec![0],
            start_time: Utc::now(),
            end_time: Utc::now(),
            content: id.to_string(),
            code_block_count: 0,
            tool_use_count: 0,
            approx_tokens: 1,
            created_at: Utc::now(),
            agent_id: None,
            vector_clock: Some(VectorClock::new()),
            spawn_depth: 0,
        }
    }

    fn seeded_engine() -> Arc<StorageEngine> {
        let engine = Arc::new(StorageEngine::open_in_memory().unwrap());
        // Two tight groups on the unit circle plus one outlier.
        let group_a = [
            [1.0f32, 0.0],
            [0.999, 0.045],
            [0.999, -0.045],
            [0.998, 0.06],
        ];
        let group_b = [
            [0.0f32, 1.0],
            [0.045, 0.999],
            [-0.045, 0.999],
            [0.06, 0.998],
        ];
        let outlier = [[-0.707f32, -0.707]];
        let mut chunks = Vec::new();
        let mut vectors = Vec::new();
        for (i, v) in group_a.iter().chain(&group_b).chain(&outlier).enumerate() {
            let id = format!("c{i:02}");
            chunks.push(chunk(&id));
            vectors.push((id, v.to_vec()));
        }
        engine.insert_chunks(&chunks).unwrap();
        for (id, v) in &vectors {
            engine.insert_vector(id, "p", v).unwrap();
        }
        engine
    }

    fn config() -> ClusterConfig {
        ClusterConfig {
            min_cluster_size: 3,
            parallel: false,
            ..Default::default()
        }
    }

    #[test]
    fn recluster_persists_clusters_and_assignments() {
        let engine = seeded_engine();
        let manager = ClusterManager::new(engine.clone(), config());
        let summary = manager.recluster().unwrap();

        assert_eq!(summary.num_clusters, 2);
        assert_eq!(summary.assigned_chunks, 8);
        assert_eq!(summary.reassigned_noise, 8);

        let clusters = engine.all_clusters().unwrap();
        assert_eq!(clusters.len(), 2);
        for cluster in &clusters {
            let members = engine.cluster_members(&cluster.id).unwrap();
            assert_eq!(members.len(), 4);
            // Stored hash matches the members the store reports.
            let ids: Vec<String> = members.into_iter().map(|a| a.chunk_id).collect();
            assert_eq!(cluster.membership_hash, Some(membership_hash(&ids)));
            assert!(!cluster.exemplar_ids.is_empty());
        }
    }

    #[test]
    fn stable_membership_keeps_cluster_ids_and_names() {
        let engine = seeded_engine();
        let manager = ClusterManager::new(engine.clone(), config());
        manager.recluster().unwrap();

        let mut before = engine.all_clusters().unwrap();
        before.sort_by(|a, b| a.id.cmp(&b.id));
        engine
            .set_cluster_label(&before[0].id, "auth flow", "login discussions", Utc::now())
            .unwrap();

        // Nothing changed in the store: same clusters, same ids.
        let second = manager.recluster().unwrap();
        assert_eq!(second.num_clusters, 2);
        assert_eq!(second.reassigned_noise, 0);

        let mut after = engine.all_clusters().unwrap();
        after.sort_by(|a, b| a.id.cmp(&b.id));
        let ids_before: Vec<&String> = before.iter().map(|c| &c.id).collect();
        let ids_after: Vec<&String> = after.iter().map(|c| &c.id).collect();
        assert_eq!(ids_before, ids_after);
        assert!(after.iter().any(|c| c.name.as_deref() == Some("auth flow")));
    }

    #[test]
    fn empty_store_reports_no_vectors() {
        let engine = Arc::new(StorageEngine::open_in_memory().unwrap());
        let manager = ClusterManager::new(engine, config());
        assert_eq!(manager.recluster().unwrap_err().code(), "NO_VECTORS");
    }
}
