//! links_cluster: an online agglomerative clustering engine for unit-norm
//! embedding vectors.
//!
//! Implements the "Links" scheme: vectors arrive one at a time and are
//! absorbed into, attached alongside, or seeded as a brand-new cluster,
//! while a similarity graph over sub-cluster centroids is continuously
//! maintained so that every cluster stays a single connected component.
//!
//! # Core Concepts
//!
//! - **Sub-cluster**: a micro-cluster with a running-mean centroid, a
//!   population count, and a set of peer sub-clusters.
//! - **Cluster**: the connected component of the sub-cluster adjacency
//!   graph, materialized as an ordered list.
//! - **τ(k, k')**: the population-scaled cosine threshold governing edge
//!   existence between two sub-clusters.
//!
//! # Example
//!
//! ```
//! use links_cluster::LinksCluster;
//!
//! let mut engine = LinksCluster::new(0.7, 0.9, 0.99, false).unwrap();
//! engine.predict(vec![1.0, 0.0, 0.0], None).unwrap();
//! assert_eq!(engine.clusters().len(), 1);
//! ```

mod cluster;
pub mod engine;
pub mod error;
pub mod id;
pub mod observation;
pub mod similarity;
pub mod storage;
mod subcluster;

pub use cluster::Cluster;
pub use engine::LinksCluster;
pub use error::{ClusterError, StorageError};
pub use id::{ClusterId, DeterministicIdGenerator, IdGenerator, RandomIdGenerator, SubclusterId};
pub use observation::{ConversationWindow, ObservationMetadata};
pub use subcluster::Subcluster;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
