//! SQLite storage backend for the clustering engine.
//!
//! One table, `clusters(id TEXT PRIMARY KEY, subclusters TEXT NOT NULL)`,
//! storing each cluster's sub-cluster list as a JSON array. Positional
//! sub-cluster operations are implemented by deserializing the array,
//! mutating it in Rust, and writing it back — SQLite's `json_insert` /
//! `json_replace` / `json_remove` functions are an alternative the reference
//! adapter used, but doing the splice application-side keeps this adapter
//! independent of the SQLite build's JSON1 extension.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::traits::{ClusterDocument, ClusterStore, StorageResult, SubclusterDocument};
use crate::error::StorageError;
use crate::id::ClusterId;

pub struct SqliteClusterStore {
    conn: Mutex<Connection>,
}

impl SqliteClusterStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| StorageError::Database(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Database(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS clusters (
                id TEXT NOT NULL PRIMARY KEY,
                subclusters TEXT NOT NULL DEFAULT '[]'
            );
            "#,
        )
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn row_to_document(id: String, subclusters_json: String) -> StorageResult<ClusterDocument> {
        let subclusters: Vec<SubclusterDocument> = serde_json::from_str(&subclusters_json)?;
        Ok(ClusterDocument { id, subclusters })
    }
}

impl ClusterStore for SqliteClusterStore {
    fn upsert(&self, id: ClusterId, doc: &ClusterDocument) -> StorageResult<()> {
        let conn = self.conn.lock().expect("lock poisoned");
        let subclusters_json = serde_json::to_string(&doc.subclusters)?;
        conn.execute(
            "INSERT INTO clusters (id, subclusters) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET subclusters = excluded.subclusters",
            params![id.as_str(), subclusters_json],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    fn get(&self, id: ClusterId) -> StorageResult<Option<ClusterDocument>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let row = conn
            .query_row(
                "SELECT id, subclusters FROM clusters WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        row.map(|(id, json)| Self::row_to_document(id, json)).transpose()
    }

    fn delete(&self, id: ClusterId) -> StorageResult<bool> {
        let conn = self.conn.lock().expect("lock poisoned");
        let affected = conn
            .execute("DELETE FROM clusters WHERE id = ?1", params![id.as_str()])
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(affected > 0)
    }

    fn list_all(&self) -> StorageResult<Vec<ClusterDocument>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mut stmt = conn
            .prepare("SELECT id, subclusters FROM clusters ORDER BY rowid")
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, json) = row.map_err(|e| StorageError::Database(e.to_string()))?;
            docs.push(Self::row_to_document(id, json)?);
        }
        Ok(docs)
    }

    fn insert_subcluster(&self, cluster_id: ClusterId, index: usize, doc: SubclusterDocument) -> StorageResult<()> {
        let existing = self.get(cluster_id)?.ok_or_else(|| StorageError::NotFound(cluster_id.as_str()))?;
        let mut subclusters = existing.subclusters;
        if index > subclusters.len() {
            return Err(StorageError::IndexOutOfBounds { index, len: subclusters.len() });
        }
        subclusters.insert(index, doc);
        self.upsert(cluster_id, &ClusterDocument { id: existing.id, subclusters })
    }

    fn replace_subcluster(&self, cluster_id: ClusterId, index: usize, doc: SubclusterDocument) -> StorageResult<()> {
        let existing = self.get(cluster_id)?.ok_or_else(|| StorageError::NotFound(cluster_id.as_str()))?;
        let mut subclusters = existing.subclusters;
        let len = subclusters.len();
        let slot = subclusters.get_mut(index).ok_or(StorageError::IndexOutOfBounds { index, len })?;
        *slot = doc;
        self.upsert(cluster_id, &ClusterDocument { id: existing.id, subclusters })
    }

    fn remove_subcluster(&self, cluster_id: ClusterId, index: usize) -> StorageResult<()> {
        let existing = self.get(cluster_id)?.ok_or_else(|| StorageError::NotFound(cluster_id.as_str()))?;
        let mut subclusters = existing.subclusters;
        if index >= subclusters.len() {
            return Err(StorageError::IndexOutOfBounds { index, len: subclusters.len() });
        }
        subclusters.remove(index);
        self.upsert(cluster_id, &ClusterDocument { id: existing.id, subclusters })
    }

    fn get_subcluster(&self, cluster_id: ClusterId, index: usize) -> StorageResult<Option<SubclusterDocument>> {
        let existing = self.get(cluster_id)?;
        Ok(existing.and_then(|doc| doc.subclusters.get(index).cloned()))
    }
}
