use links_cluster::id::{DeterministicIdGenerator, IdGenerator};
use links_cluster::storage::{cluster_to_document, document_to_cluster, ClusterStore, InMemoryClusterStore, SqliteClusterStore};
use links_cluster::LinksCluster;

#[test]
fn cluster_round_trips_through_sqlite_with_neighbors_intact() {
    let mut engine = LinksCluster::with_id_generator(0.5, 0.9, 0.99, false, Box::new(DeterministicIdGenerator::new())).unwrap();
    engine.predict(vec![1.0, 0.0, 0.0], None).unwrap();
    engine.predict(vec![0.85, 0.5268, 0.0], None).unwrap();

    let cluster = &engine.clusters()[0];
    assert_eq!(cluster.subclusters.len(), 2);

    let doc = cluster_to_document(cluster);

    let store = SqliteClusterStore::open_in_memory().unwrap();
    store.upsert(cluster.id, &doc).unwrap();

    let fetched = store.get(cluster.id).unwrap().expect("cluster round-trips");
    let restored = document_to_cluster(&fetched).unwrap();

    assert_eq!(restored.subclusters.len(), 2);
    for original in &cluster.subclusters {
        let counterpart = restored.get(original.id).expect("subcluster present after restore");
        assert_eq!(counterpart.centroid(), original.centroid());
        assert_eq!(counterpart.neighbors, original.neighbors);
    }
}

#[test]
fn tempfile_backed_store_persists_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clusters.sqlite3");

    let mut gen = DeterministicIdGenerator::new();
    let cluster_id = gen.next_cluster_id();
    let sub_id = gen.next_subcluster_id();

    {
        let store = SqliteClusterStore::open(&db_path).unwrap();
        let sub = links_cluster::Subcluster::new(sub_id, vec![1.0, 0.0], false);
        let cluster = links_cluster::Cluster::new(cluster_id, sub);
        store.upsert(cluster_id, &cluster_to_document(&cluster)).unwrap();
    }

    {
        let store = SqliteClusterStore::open(&db_path).unwrap();
        let fetched = store.get(cluster_id).unwrap().expect("persisted across handles");
        assert_eq!(fetched.subclusters.len(), 1);
    }
}

#[test]
fn rehydration_skips_an_unresolvable_peer_id_with_a_warning_not_a_panic() {
    let mut gen = DeterministicIdGenerator::new();
    let cluster_id = gen.next_cluster_id();
    let sub_id = gen.next_subcluster_id();

    let sub = links_cluster::Subcluster::new(sub_id, vec![1.0, 0.0], false);
    let cluster = links_cluster::Cluster::new(cluster_id, sub);
    let mut doc = cluster_to_document(&cluster);
    doc.subclusters[0].connected_subclusters.push("not-a-real-peer-id".to_string());

    // from_string would fail to parse "not-a-real-peer-id" as a UUID; this
    // must be logged and skipped, not propagated as an error.
    let restored = document_to_cluster(&doc).unwrap();
    assert!(restored.subclusters[0].neighbors.is_empty());
}

#[test]
fn in_memory_store_round_trips_identically_to_sqlite() {
    let mut gen = DeterministicIdGenerator::new();
    let cluster_id = gen.next_cluster_id();
    let sub_id = gen.next_subcluster_id();
    let sub = links_cluster::Subcluster::new(sub_id, vec![3.0, 4.0], false);
    let cluster = links_cluster::Cluster::new(cluster_id, sub);
    let doc = cluster_to_document(&cluster);

    let mem_store = InMemoryClusterStore::new();
    mem_store.upsert(cluster_id, &doc).unwrap();
    let from_mem = mem_store.get(cluster_id).unwrap().unwrap();

    let sql_store = SqliteClusterStore::open_in_memory().unwrap();
    sql_store.upsert(cluster_id, &doc).unwrap();
    let from_sql = sql_store.get(cluster_id).unwrap().unwrap();

    assert_eq!(from_mem.subclusters[0].centroid, from_sql.subclusters[0].centroid);
}
