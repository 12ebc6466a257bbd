use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::id::SubclusterId;
use crate::observation::ObservationMetadata;

/// A dense micro-cluster: one centroid, a population count, and the set of
/// peer sub-clusters it is connected to within its owning cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcluster {
    pub id: SubclusterId,
    centroid: Vec<f64>,
    vector_count: usize,
    store_vectors: bool,
    vectors: Vec<Vec<f64>>,
    pub neighbors: BTreeSet<SubclusterId>,
    pub observation: ObservationMetadata,
}

impl Subcluster {
    /// Creates a sub-cluster from its first vector.
    pub fn new(id: SubclusterId, vector: Vec<f64>, store_vectors: bool) -> Self {
        Self::with_observation(id, vector, store_vectors, None)
    }

    /// Creates a sub-cluster from its first vector, optionally recording an
    /// initial observation timestamp.
    pub fn with_observation(
        id: SubclusterId,
        vector: Vec<f64>,
        store_vectors: bool,
        observed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let vectors = if store_vectors {
            vec![vector.clone()]
        } else {
            Vec::new()
        };
        let mut observation = ObservationMetadata::default();
        if let Some(at) = observed_at {
            observation.observe(at);
        }
        Self {
            id,
            centroid: vector,
            vector_count: 1,
            store_vectors,
            vectors,
            neighbors: BTreeSet::new(),
            observation,
        }
    }

    /// Reconstructs a sub-cluster from already-computed parts, bypassing the
    /// running-mean bookkeeping `add`/`merge` perform. Used by the storage
    /// layer when rehydrating a document back into a live sub-cluster.
    pub(crate) fn from_parts(
        id: SubclusterId,
        centroid: Vec<f64>,
        vector_count: usize,
        store_vectors: bool,
        vectors: Vec<Vec<f64>>,
        observation: ObservationMetadata,
    ) -> Self {
        Self {
            id,
            centroid,
            vector_count,
            store_vectors,
            vectors,
            neighbors: BTreeSet::new(),
            observation,
        }
    }

    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    pub fn vector_count(&self) -> usize {
        self.vector_count
    }

    pub fn store_vectors(&self) -> bool {
        self.store_vectors
    }

    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    /// Absorbs `vector` into this sub-cluster: updates the running-mean
    /// centroid via the incremental-mean formula and records the observation.
    pub fn add(&mut self, vector: Vec<f64>, observed_at: Option<DateTime<Utc>>) -> Result<(), ClusterError> {
        if vector.len() != self.centroid.len() {
            return Err(ClusterError::ShapeMismatch {
                expected: self.centroid.len(),
                actual: vector.len(),
            });
        }

        self.vector_count += 1;
        let k = self.vector_count as f64;
        for (c, v) in self.centroid.iter_mut().zip(vector.iter()) {
            *c = ((k - 1.0) / k) * *c + v / k;
        }

        if self.store_vectors {
            self.vectors.push(vector);
        }

        if let Some(at) = observed_at {
            self.observation.observe(at);
        }

        Ok(())
    }

    /// Folds `other` into `self` using the population-weighted centroid mean.
    /// `other`'s identity is retired by the caller after this call returns;
    /// neighbor-set surgery (removing the mutual edge, re-pointing third
    /// parties) is the caller's responsibility since it spans sub-clusters.
    pub fn merge(&mut self, other: Subcluster) -> Result<(), ClusterError> {
        if other.centroid.len() != self.centroid.len() {
            return Err(ClusterError::ShapeMismatch {
                expected: self.centroid.len(),
                actual: other.centroid.len(),
            });
        }

        let k = self.vector_count as f64;
        let k_prime = other.vector_count as f64;
        let total = k + k_prime;
        for (c, c_prime) in self.centroid.iter_mut().zip(other.centroid.iter()) {
            *c = (k * *c + k_prime * c_prime) / total;
        }
        self.vector_count += other.vector_count;

        if self.store_vectors {
            self.vectors.extend(other.vectors);
        }

        self.observation.merge(other.observation);

        Ok(())
    }
}
