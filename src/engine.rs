use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cluster::Cluster;
use crate::error::ClusterError;
use crate::id::{ClusterId, IdGenerator, RandomIdGenerator, SubclusterId};
use crate::similarity::{self, cosine, population_threshold};
use crate::subcluster::Subcluster;

/// Online agglomerative clustering engine over unit-norm vectors.
///
/// Owns the full set of clusters directly (`Vec<Cluster>`, no interior
/// mutability): the model is single-threaded cooperative, one `predict` at a
/// time runs to completion before the next begins. A host needing shared
/// access wraps the whole engine in its own mutex.
pub struct LinksCluster {
    clusters: Vec<Cluster>,
    cluster_sim: f64,
    subcluster_sim: f64,
    pair_sim_max: f64,
    store_vectors: bool,
    dim: Option<usize>,
    id_gen: Box<dyn IdGenerator>,
}

impl LinksCluster {
    /// `cluster_sim` (S) ≤ `subcluster_sim` (σ) ≤ `pair_sim_max` (M) ≤ 1,
    /// and 0 < S < 1.
    pub fn new(cluster_sim: f64, subcluster_sim: f64, pair_sim_max: f64, store_vectors: bool) -> Result<Self, ClusterError> {
        Self::with_id_generator(
            cluster_sim,
            subcluster_sim,
            pair_sim_max,
            store_vectors,
            Box::new(RandomIdGenerator),
        )
    }

    pub fn with_id_generator(
        cluster_sim: f64,
        subcluster_sim: f64,
        pair_sim_max: f64,
        store_vectors: bool,
        id_gen: Box<dyn IdGenerator>,
    ) -> Result<Self, ClusterError> {
        similarity::validate_params(cluster_sim, subcluster_sim, pair_sim_max)?;
        Ok(Self {
            clusters: Vec::new(),
            cluster_sim,
            subcluster_sim,
            pair_sim_max,
            store_vectors,
            dim: None,
            id_gen,
        })
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    fn cluster_index_of(&self, id: ClusterId) -> Option<usize> {
        self.clusters.iter().position(|c| c.id == id)
    }

    fn validate_vector(&mut self, v: &[f64]) -> Result<(), ClusterError> {
        match self.dim {
            Some(d) if d != v.len() => Err(ClusterError::ShapeMismatch {
                expected: d,
                actual: v.len(),
            }),
            Some(_) => Ok(()),
            None => {
                self.dim = Some(v.len());
                Ok(())
            }
        }
    }

    fn threshold(&self, k: usize, k_prime: usize) -> f64 {
        population_threshold(k, k_prime, self.cluster_sim, self.pair_sim_max)
    }

    /// Returns every vector ever stored, across every sub-cluster. Errors if
    /// the engine was not configured to retain raw vectors.
    pub fn get_all_vectors(&self) -> Result<Vec<Vec<f64>>, ClusterError> {
        if !self.store_vectors {
            return Err(ClusterError::NotRetained);
        }
        Ok(self
            .clusters
            .iter()
            .flat_map(|c| c.subclusters.iter())
            .flat_map(|s| s.vectors().iter().cloned())
            .collect())
    }

    /// Places `v`: absorbed into an existing sub-cluster, attached as a new
    /// peer sub-cluster, or seeded as a brand-new cluster. Returns the
    /// affected cluster's id, or `None` on the very first call (no prior
    /// cluster existed to report).
    pub fn predict(&mut self, v: Vec<f64>, observed_at: Option<DateTime<Utc>>) -> Result<Option<ClusterId>, ClusterError> {
        self.validate_vector(&v)?;

        if self.clusters.is_empty() {
            let sub_id = self.id_gen.next_subcluster_id();
            let cluster_id = self.id_gen.next_cluster_id();
            let sub = Subcluster::with_observation(sub_id, v, self.store_vectors, observed_at);
            self.clusters.push(Cluster::new(cluster_id, sub));
            debug!(%cluster_id, %sub_id, "seeded first cluster");
            return Ok(None);
        }

        let mut best: Option<(usize, usize, f64)> = None;
        for (ci, cluster) in self.clusters.iter().enumerate() {
            for (sj, sub) in cluster.subclusters.iter().enumerate() {
                let sim = cosine(sub.centroid(), &v)?;
                match best {
                    Some((_, _, best_sim)) if sim <= best_sim => {}
                    _ => best = Some((ci, sj, sim)),
                }
            }
        }
        let (ci, sj, best_sim) = best.expect("at least one cluster is present");

        if best_sim >= self.subcluster_sim {
            let cluster_id = self.clusters[ci].id;
            let sub_id = self.clusters[ci].subclusters[sj].id;
            self.clusters[ci]
                .get_mut(sub_id)
                .expect("located by index above")
                .add(v, observed_at)?;
            debug!(%cluster_id, %sub_id, sim = best_sim, "absorbed vector");
            self.update_cluster(cluster_id, sub_id)?;
            return Ok(Some(cluster_id));
        }

        let target_sub = &self.clusters[ci].subclusters[sj];
        let tau = self.threshold(target_sub.vector_count(), 1);
        let new_sub_id = self.id_gen.next_subcluster_id();
        let new_sub = Subcluster::with_observation(new_sub_id, v, self.store_vectors, observed_at);

        if best_sim >= tau {
            let cluster_id = self.clusters[ci].id;
            let target_id = self.clusters[ci].subclusters[sj].id;
            self.clusters[ci].push(new_sub);
            self.clusters[ci].add_edge(target_id, new_sub_id)?;
            debug!(%cluster_id, %new_sub_id, %target_id, sim = best_sim, tau, "attached new sub-cluster");
            return Ok(Some(cluster_id));
        }

        let cluster_id = self.id_gen.next_cluster_id();
        self.clusters.push(Cluster::new(cluster_id, new_sub));
        debug!(%cluster_id, %new_sub_id, sim = best_sim, tau, "created new cluster");
        Ok(Some(cluster_id))
    }

    /// Re-evaluates every edge incident to `sub_id` within cluster
    /// `cluster_id`, merging sub-clusters whose similarity now exceeds σ,
    /// reassessing surviving edges against τ, attempting reattachment of any
    /// severed neighbor, and splitting off neighbors that end up isolated.
    pub fn update_cluster(&mut self, cluster_id: ClusterId, sub_id: SubclusterId) -> Result<(), ClusterError> {
        let ci = self
            .cluster_index_of(cluster_id)
            .ok_or_else(|| ClusterError::InvariantViolation(format!("update_cluster: cluster {cluster_id} not found")))?;

        let mut severed_candidates: Vec<SubclusterId> = Vec::new();

        // Rescan sub_id's neighbors to a fixpoint: a merge changes the
        // neighbor set (the merged-in peer's third parties repoint onto
        // sub_id), so the pass restarts from scratch rather than resuming
        // mid-snapshot. Each merge strictly shrinks the cluster's
        // sub-cluster count, so this always terminates. Candidates severed
        // in an earlier pass stay severed (their edge to sub_id is already
        // gone, so they won't reappear in a later snapshot) and are carried
        // through to the reattach/split handling below exactly once.
        loop {
            let neighbor_snapshot: Vec<SubclusterId> = match self.clusters[ci].get(sub_id) {
                Some(sub) => sub.neighbors.iter().copied().collect(),
                None => return Ok(()),
            };

            let mut merged = false;

            for w in neighbor_snapshot {
                if self.clusters[ci].index_of(w).is_none() {
                    warn!(%cluster_id, neighbor = %w, "neighbor vanished during update_cluster pass, skipping");
                    continue;
                }

                let centroid_j = self.clusters[ci].get(sub_id).unwrap().centroid().to_vec();
                let centroid_w = self.clusters[ci].get(w).unwrap().centroid().to_vec();
                let rho = cosine(&centroid_j, &centroid_w)?;

                if rho >= self.subcluster_sim {
                    self.clusters[ci].merge_subclusters(sub_id, w)?;
                    debug!(%cluster_id, keep = %sub_id, merged = %w, sim = rho, "merged neighbor");
                    merged = true;
                    break;
                }

                let k_j = self.clusters[ci].get(sub_id).unwrap().vector_count();
                let k_w = self.clusters[ci].get(w).unwrap().vector_count();
                let tau = self.threshold(k_j, k_w);

                if rho >= tau {
                    self.clusters[ci].add_edge(sub_id, w)?;
                } else {
                    let removed = self.clusters[ci].remove_edge(sub_id, w);
                    if !removed {
                        warn!(%cluster_id, a = %sub_id, b = %w, "edge already absent during reassessment");
                    }
                    severed_candidates.push(w);
                }
            }

            if !merged {
                break;
            }
        }

        for candidate in severed_candidates {
            if self.clusters[ci].index_of(candidate).is_none() {
                continue;
            }
            let has_neighbors = !self.clusters[ci].get(candidate).unwrap().neighbors.is_empty();
            if has_neighbors {
                continue;
            }

            self.attempt_reattach(ci, candidate)?;

            let still_isolated = self.clusters[ci].get(candidate).unwrap().neighbors.is_empty();
            if still_isolated {
                self.split_off(ci, candidate)?;
            }
        }

        Ok(())
    }

    fn attempt_reattach(&mut self, ci: usize, candidate: SubclusterId) -> Result<(), ClusterError> {
        let peer_ids: Vec<SubclusterId> = self.clusters[ci]
            .subclusters
            .iter()
            .map(|s| s.id)
            .filter(|&id| id != candidate)
            .collect();

        let candidate_centroid = self.clusters[ci].get(candidate).unwrap().centroid().to_vec();
        let candidate_k = self.clusters[ci].get(candidate).unwrap().vector_count();

        for peer in peer_ids {
            let peer_sub = self.clusters[ci].get(peer).unwrap();
            let sim = cosine(peer_sub.centroid(), &candidate_centroid)?;
            let tau = self.threshold(peer_sub.vector_count(), candidate_k);
            if sim >= tau {
                self.clusters[ci].add_edge(peer, candidate)?;
                debug!(peer = %peer, candidate = %candidate, sim, tau, "reattached severed sub-cluster");
                return Ok(());
            }
        }
        Ok(())
    }

    fn split_off(&mut self, ci: usize, candidate: SubclusterId) -> Result<(), ClusterError> {
        let removed = self.clusters[ci]
            .remove(candidate)
            .ok_or_else(|| ClusterError::InvariantViolation(format!("split_off: {candidate} missing")))?;
        let new_cluster_id = self.id_gen.next_cluster_id();
        debug!(old_cluster = %self.clusters[ci].id, new_cluster = %new_cluster_id, sub_id = %candidate, "split off isolated sub-cluster");
        self.clusters.push(Cluster::new(new_cluster_id, removed));
        Ok(())
    }
}
