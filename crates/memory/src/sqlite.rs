//! SQLite vector store.
//!
//! Records live in a single `memory_vectors` table with the embedding packed
//! as a little-endian f32 blob. Queries load the vectors and rank them by
//! brute-force cosine similarity, which is fine at per-deployment scale.

use async_trait::async_trait;
use concierge_core::error::MemoryError;
use concierge_core::memory::{MemoryMatch, MemoryRecord, VectorStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::vector::rank_by_similarity;

/// Open a pool for `path`, creating the database file if missing.
///
/// `":memory:"` (or `"sqlite::memory:"`) gives an ephemeral database. It is
/// held on a single connection that never expires, so every query sees the
/// same data.
pub async fn connect(path: &str) -> Result<SqlitePool, sqlx::Error> {
    let ephemeral = path.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(path)?
        .create_if_missing(true)
        .synchronous(SqliteSynchronous::Normal);
    if !ephemeral {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if ephemeral {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };

    pool_options.connect_with(options).await
}

/// A SQLite-backed vector store.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (or create) the store at `path`.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let pool = connect(path)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;
        let store = Self::from_pool(pool).await?;
        info!("SQLite vector store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for sharing one database file).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memory_vectors (
                id          TEXT PRIMARY KEY NOT NULL,
                owner_id    TEXT NOT NULL,
                text        TEXT NOT NULL,
                embedding   BLOB NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("memory_vectors table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memory_vectors_owner ON memory_vectors(owner_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("owner index: {e}")))?;

        Ok(())
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<MemoryMatch>, MemoryError> {
        let rows = sqlx::query("SELECT id, owner_id, text, embedding FROM memory_vectors")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(e.to_string()))?;

        let records: Vec<MemoryRecord> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                MemoryRecord {
                    id: row.get("id"),
                    vector: Self::blob_to_embedding(&blob),
                    owner_id: row.get("owner_id"),
                    text: row.get("text"),
                }
            })
            .collect();

        debug!(candidates = records.len(), top_k, "Ranking stored vectors");
        Ok(rank_by_similarity(&records, vector, top_k))
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO memory_vectors (id, owner_id, text, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                text = excluded.text,
                embedding = excluded.embedding
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner_id)
        .bind(&record.text)
        .bind(Self::embedding_to_blob(&record.vector))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM memory_vectors")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(e.to_string()))?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str, vector: Vec<f32>) -> MemoryRecord {
        MemoryRecord {
            id: id.into(),
            vector,
            owner_id: "u1".into(),
            text: text.into(),
        }
    }

    #[test]
    fn blob_roundtrip_preserves_values() {
        let v = vec![0.5f32, -1.25, 3.0];
        let blob = SqliteVectorStore::embedding_to_blob(&v);
        assert_eq!(blob.len(), 12);
        assert_eq!(SqliteVectorStore::blob_to_embedding(&blob), v);
    }

    #[tokio::test]
    async fn upsert_query_count() {
        let store = SqliteVectorStore::new("sqlite::memory:").await.unwrap();
        store.upsert(record("a", "likes tea", vec![1.0, 0.0])).await.unwrap();
        store.upsert(record("b", "likes coffee", vec![0.0, 1.0])).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let matches = store.query(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "likes coffee");
    }

    #[tokio::test]
    async fn upsert_same_id_updates() {
        let store = SqliteVectorStore::new("sqlite::memory:").await.unwrap();
        store.upsert(record("a", "v1", vec![1.0])).await.unwrap();
        store.upsert(record("a", "v2", vec![1.0])).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.query(&[1.0], 4).await.unwrap()[0].text, "v2");
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteVectorStore::new(path).await.unwrap();
            store.upsert(record("a", "remember me", vec![1.0, 1.0])).await.unwrap();
        }

        let reopened = SqliteVectorStore::new(path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
