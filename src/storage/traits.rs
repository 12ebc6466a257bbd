use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cluster::Cluster;
use crate::error::StorageError;
use crate::id::{ClusterId, SubclusterId};
use crate::observation::ObservationMetadata;
use crate::subcluster::Subcluster;

pub type StorageResult<T> = Result<T, StorageError>;

/// Wire form of a [`Subcluster`]. `connected_subclusters` holds peer ids;
/// resolving them back into in-memory `neighbors` sets is a two-pass walk
/// performed by [`document_to_cluster`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubclusterDocument {
    pub id: String,
    pub centroid: Vec<f64>,
    pub vector_count: usize,
    pub store_vectors: bool,
    pub vectors: Vec<Vec<f64>>,
    pub connected_subclusters: Vec<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub observation: ObservationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDocument {
    pub id: String,
    pub subclusters: Vec<SubclusterDocument>,
}

pub fn subcluster_to_document(sub: &Subcluster) -> SubclusterDocument {
    SubclusterDocument {
        id: sub.id.as_str(),
        centroid: sub.centroid().to_vec(),
        vector_count: sub.vector_count(),
        store_vectors: sub.store_vectors(),
        vectors: sub.vectors().to_vec(),
        connected_subclusters: sub.neighbors.iter().map(|n| n.as_str()).collect(),
        last_seen: sub.observation.last_seen,
        observation: sub.observation.clone(),
    }
}

pub fn cluster_to_document(cluster: &Cluster) -> ClusterDocument {
    ClusterDocument {
        id: cluster.id.as_str(),
        subclusters: cluster.subclusters.iter().map(subcluster_to_document).collect(),
    }
}

/// Rehydrates a [`ClusterDocument`] into a live [`Cluster`] via the two-pass
/// walk: pass one builds every sub-cluster with an empty neighbor set and an
/// id→index map; pass two resolves `connected_subclusters` against that map.
/// A peer id absent from the document is logged as a warning and skipped.
pub fn document_to_cluster(doc: &ClusterDocument) -> StorageResult<Cluster> {
    let cluster_id = ClusterId::from_string(&doc.id).map_err(|e| StorageError::Database(e.to_string()))?;

    let mut subclusters = Vec::with_capacity(doc.subclusters.len());
    let mut id_index: HashMap<SubclusterId, usize> = HashMap::new();

    for (idx, sub_doc) in doc.subclusters.iter().enumerate() {
        let sub_id = SubclusterId::from_string(&sub_doc.id).map_err(|e| StorageError::Database(e.to_string()))?;
        id_index.insert(sub_id, idx);
        subclusters.push(Subcluster::from_parts(
            sub_id,
            sub_doc.centroid.clone(),
            sub_doc.vector_count,
            sub_doc.store_vectors,
            sub_doc.vectors.clone(),
            sub_doc.observation.clone(),
        ));
    }

    for (idx, sub_doc) in doc.subclusters.iter().enumerate() {
        for peer_id_str in &sub_doc.connected_subclusters {
            let peer_id = match SubclusterId::from_string(peer_id_str) {
                Ok(id) => id,
                Err(_) => {
                    warn!(cluster = %doc.id, peer = %peer_id_str, "unparsable peer id during rehydration");
                    continue;
                }
            };
            if id_index.contains_key(&peer_id) {
                subclusters[idx].neighbors.insert(peer_id);
            } else {
                warn!(cluster = %doc.id, subcluster = %sub_doc.id, peer = %peer_id_str, "peer not present in cluster document during rehydration, skipping");
            }
        }
    }

    if subclusters.is_empty() {
        return Err(StorageError::Database(format!("cluster {} has no subclusters", doc.id)));
    }
    let mut iter = subclusters.into_iter();
    let first = iter.next().unwrap();
    let mut cluster = Cluster::new(cluster_id, first);
    for sub in iter {
        cluster.push(sub);
    }
    Ok(cluster)
}

/// Persistence adapter for clusters and their sub-clusters, keyed by id with
/// positional access into each cluster's sub-cluster list (the external
/// identifier a host uses to address a specific sub-cluster is its index).
pub trait ClusterStore: Send {
    fn upsert(&self, id: ClusterId, doc: &ClusterDocument) -> StorageResult<()>;
    fn get(&self, id: ClusterId) -> StorageResult<Option<ClusterDocument>>;
    fn delete(&self, id: ClusterId) -> StorageResult<bool>;
    fn list_all(&self) -> StorageResult<Vec<ClusterDocument>>;

    fn insert_subcluster(&self, cluster_id: ClusterId, index: usize, doc: SubclusterDocument) -> StorageResult<()>;
    fn replace_subcluster(&self, cluster_id: ClusterId, index: usize, doc: SubclusterDocument) -> StorageResult<()>;
    fn remove_subcluster(&self, cluster_id: ClusterId, index: usize) -> StorageResult<()>;
    fn get_subcluster(&self, cluster_id: ClusterId, index: usize) -> StorageResult<Option<SubclusterDocument>>;
}

/// In-memory [`ClusterStore`], used by tests and as a reference
/// implementation of the positional-index contract.
#[derive(Default)]
pub struct InMemoryClusterStore {
    inner: std::sync::Mutex<Vec<ClusterDocument>>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClusterStore for InMemoryClusterStore {
    fn upsert(&self, id: ClusterId, doc: &ClusterDocument) -> StorageResult<()> {
        let mut docs = self.inner.lock().expect("lock poisoned");
        let id_str = id.as_str();
        if let Some(existing) = docs.iter_mut().find(|d| d.id == id_str) {
            *existing = doc.clone();
        } else {
            docs.push(doc.clone());
        }
        Ok(())
    }

    fn get(&self, id: ClusterId) -> StorageResult<Option<ClusterDocument>> {
        let docs = self.inner.lock().expect("lock poisoned");
        Ok(docs.iter().find(|d| d.id == id.as_str()).cloned())
    }

    fn delete(&self, id: ClusterId) -> StorageResult<bool> {
        let mut docs = self.inner.lock().expect("lock poisoned");
        let id_str = id.as_str();
        let before = docs.len();
        docs.retain(|d| d.id != id_str);
        Ok(docs.len() != before)
    }

    fn list_all(&self) -> StorageResult<Vec<ClusterDocument>> {
        Ok(self.inner.lock().expect("lock poisoned").clone())
    }

    fn insert_subcluster(&self, cluster_id: ClusterId, index: usize, doc: SubclusterDocument) -> StorageResult<()> {
        let mut docs = self.inner.lock().expect("lock poisoned");
        let cluster = find_mut(&mut docs, cluster_id)?;
        if index > cluster.subclusters.len() {
            return Err(StorageError::IndexOutOfBounds {
                index,
                len: cluster.subclusters.len(),
            });
        }
        cluster.subclusters.insert(index, doc);
        Ok(())
    }

    fn replace_subcluster(&self, cluster_id: ClusterId, index: usize, doc: SubclusterDocument) -> StorageResult<()> {
        let mut docs = self.inner.lock().expect("lock poisoned");
        let cluster = find_mut(&mut docs, cluster_id)?;
        let len = cluster.subclusters.len();
        let slot = cluster
            .subclusters
            .get_mut(index)
            .ok_or(StorageError::IndexOutOfBounds { index, len })?;
        *slot = doc;
        Ok(())
    }

    fn remove_subcluster(&self, cluster_id: ClusterId, index: usize) -> StorageResult<()> {
        let mut docs = self.inner.lock().expect("lock poisoned");
        let cluster = find_mut(&mut docs, cluster_id)?;
        if index >= cluster.subclusters.len() {
            return Err(StorageError::IndexOutOfBounds { index, len: cluster.subclusters.len() });
        }
        cluster.subclusters.remove(index);
        Ok(())
    }

    fn get_subcluster(&self, cluster_id: ClusterId, index: usize) -> StorageResult<Option<SubclusterDocument>> {
        let docs = self.inner.lock().expect("lock poisoned");
        let cluster = docs.iter().find(|d| d.id == cluster_id.as_str());
        Ok(cluster.and_then(|c| c.subclusters.get(index).cloned()))
    }
}

fn find_mut(docs: &mut [ClusterDocument], id: ClusterId) -> StorageResult<&mut ClusterDocument> {
    let id_str = id.as_str();
    docs.iter_mut()
        .find(|d| d.id == id_str)
        .ok_or_else(|| StorageError::NotFound(id_str))
}
