//! Persistence adapters for the clustering engine.
//!
//! The engine itself holds no reference to any store; a host application
//! reads and writes clusters through the [`ClusterStore`] trait, choosing
//! [`SqliteClusterStore`] for durability or [`InMemoryClusterStore`] for
//! tests and ephemeral use.

mod sqlite;
mod traits;

pub use sqlite::SqliteClusterStore;
pub use traits::{
    cluster_to_document, document_to_cluster, subcluster_to_document, ClusterDocument, ClusterStore,
    InMemoryClusterStore, StorageResult, SubclusterDocument,
};
