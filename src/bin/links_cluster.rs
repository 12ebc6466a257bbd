//! links-cluster CLI — feed a CSV of vectors through the clustering engine
//! and inspect the resulting clusters.
//!
//! Usage:
//!   links-cluster ingest --input vectors.csv [--db path] [--store-vectors]
//!   links-cluster show --db path

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use links_cluster::storage::{cluster_to_document, ClusterStore, SqliteClusterStore};
use links_cluster::LinksCluster;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "links-cluster", version, about = "Online agglomerative clustering over embedding vectors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a CSV of vectors (one row per vector, one column per dimension) and persist the resulting clusters.
    Ingest {
        /// Path to a headerless CSV file of vectors.
        #[arg(long)]
        input: PathBuf,
        /// Path to the SQLite database file; created if missing.
        #[arg(long)]
        db: PathBuf,
        /// Base cluster similarity threshold S.
        #[arg(long, default_value_t = 0.7)]
        cluster_sim: f64,
        /// Sub-cluster absorption threshold sigma.
        #[arg(long, default_value_t = 0.9)]
        subcluster_sim: f64,
        /// Pair similarity maximum M.
        #[arg(long, default_value_t = 0.99)]
        pair_sim_max: f64,
        /// Retain raw vectors on each sub-cluster.
        #[arg(long, default_value_t = false)]
        store_vectors: bool,
    },
    /// Print every cluster currently persisted in a database.
    Show {
        #[arg(long)]
        db: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Ingest {
            input,
            db,
            cluster_sim,
            subcluster_sim,
            pair_sim_max,
            store_vectors,
        } => run_ingest(input, db, cluster_sim, subcluster_sim, pair_sim_max, store_vectors),
        Commands::Show { db } => run_show(db),
    };
    std::process::exit(code);
}

fn run_ingest(input: PathBuf, db: PathBuf, cluster_sim: f64, subcluster_sim: f64, pair_sim_max: f64, store_vectors: bool) -> i32 {
    let mut engine = match LinksCluster::new(cluster_sim, subcluster_sim, pair_sim_max, store_vectors) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: bad engine parameters: {e}");
            return 1;
        }
    };

    let mut reader = match csv::ReaderBuilder::new().has_headers(false).from_path(&input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: failed to open {}: {e}", input.display());
            return 1;
        }
    };

    let mut count = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: malformed CSV row: {e}");
                return 1;
            }
        };
        let vector: Result<Vec<f64>, _> = record.iter().map(|field| field.trim().parse::<f64>()).collect();
        let vector = match vector {
            Ok(v) => v,
            Err(e) => {
                eprintln!("error: non-numeric field in row {count}: {e}");
                return 1;
            }
        };
        if let Err(e) = engine.predict(vector, None) {
            eprintln!("error: predict failed on row {count}: {e}");
            return 1;
        }
        count += 1;
    }

    let store = match SqliteClusterStore::open(&db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to open database {}: {e}", db.display());
            return 1;
        }
    };

    for cluster in engine.clusters() {
        let doc = cluster_to_document(cluster);
        if let Err(e) = store.upsert(cluster.id, &doc) {
            eprintln!("error: failed to persist cluster {}: {e}", cluster.id);
            return 1;
        }
    }

    println!("ingested {count} vectors into {} clusters", engine.clusters().len());
    0
}

fn run_show(db: PathBuf) -> i32 {
    let store = match SqliteClusterStore::open(&db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to open database {}: {e}", db.display());
            return 1;
        }
    };

    let clusters = match store.list_all() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to list clusters: {e}");
            return 1;
        }
    };

    for doc in clusters {
        println!("cluster {} ({} sub-clusters)", doc.id, doc.subclusters.len());
        for sub in &doc.subclusters {
            println!(
                "  subcluster {} count={} neighbors={}",
                sub.id,
                sub.vector_count,
                sub.connected_subclusters.len()
            );
        }
    }
    0
}
