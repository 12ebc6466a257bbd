use crate::error::ClusterError;
use crate::id::{ClusterId, SubclusterId};
use crate::subcluster::Subcluster;

/// A connected component of the sub-cluster adjacency graph, materialized as
/// an ordered list. Index positions double as the external identifier used
/// by the persistence adapter, so removals compact the list rather than
/// leaving holes.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub subclusters: Vec<Subcluster>,
}

impl Cluster {
    pub fn new(id: ClusterId, seed: Subcluster) -> Self {
        Self {
            id,
            subclusters: vec![seed],
        }
    }

    pub fn index_of(&self, id: SubclusterId) -> Option<usize> {
        self.subclusters.iter().position(|s| s.id == id)
    }

    pub fn get(&self, id: SubclusterId) -> Option<&Subcluster> {
        self.subclusters.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SubclusterId) -> Option<&mut Subcluster> {
        self.subclusters.iter_mut().find(|s| s.id == id)
    }

    pub fn push(&mut self, sub: Subcluster) {
        self.subclusters.push(sub);
    }

    /// Removes the sub-cluster with `id`, also stripping every edge any
    /// remaining sub-cluster held to it. Returns the removed sub-cluster.
    pub fn remove(&mut self, id: SubclusterId) -> Option<Subcluster> {
        let idx = self.index_of(id)?;
        let removed = self.subclusters.remove(idx);
        for s in &mut self.subclusters {
            s.neighbors.remove(&id);
        }
        Some(removed)
    }

    /// Adds a symmetric edge between two sub-clusters already in this
    /// cluster. No-op (not an error) if the edge already exists.
    pub fn add_edge(&mut self, a: SubclusterId, b: SubclusterId) -> Result<(), ClusterError> {
        if self.index_of(a).is_none() || self.index_of(b).is_none() {
            return Err(ClusterError::InvariantViolation(format!(
                "add_edge: {a} or {b} not present in cluster {}",
                self.id
            )));
        }
        self.get_mut(a).unwrap().neighbors.insert(b);
        self.get_mut(b).unwrap().neighbors.insert(a);
        Ok(())
    }

    /// Removes the edge between two sub-clusters. Not fatal if it was
    /// already absent — the caller logs a warning in that case.
    pub fn remove_edge(&mut self, a: SubclusterId, b: SubclusterId) -> bool {
        let removed_a = self.get_mut(a).map(|s| s.neighbors.remove(&b)).unwrap_or(false);
        let removed_b = self.get_mut(b).map(|s| s.neighbors.remove(&a)).unwrap_or(false);
        removed_a || removed_b
    }

    /// Merges the sub-cluster at `remove_id` into `keep_id`: folds its mass
    /// into the survivor, removes the mutual edge if present, re-points every
    /// third party that neighbored the removed sub-cluster onto the
    /// survivor, and removes the now-empty entry from the list.
    pub fn merge_subclusters(&mut self, keep_id: SubclusterId, remove_id: SubclusterId) -> Result<(), ClusterError> {
        let removed = self
            .remove(remove_id)
            .ok_or_else(|| ClusterError::InvariantViolation(format!("merge: {remove_id} not in cluster")))?;

        let third_parties: Vec<SubclusterId> = removed.neighbors.iter().copied().filter(|&n| n != keep_id).collect();

        let keep = self
            .get_mut(keep_id)
            .ok_or_else(|| ClusterError::InvariantViolation(format!("merge: {keep_id} not in cluster")))?;
        keep.merge(removed)?;

        for third in third_parties {
            if self.index_of(third).is_some() {
                self.add_edge(keep_id, third)?;
            }
        }

        Ok(())
    }

    /// Whether every sub-cluster in this cluster is reachable from every
    /// other via `neighbors` (the post-condition `predict` must restore).
    pub fn is_single_component(&self) -> bool {
        if self.subclusters.is_empty() {
            return true;
        }
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![self.subclusters[0].id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(s) = self.get(id) {
                for &n in &s.neighbors {
                    if !visited.contains(&n) {
                        stack.push(n);
                    }
                }
            }
        }
        visited.len() == self.subclusters.len()
    }
}
