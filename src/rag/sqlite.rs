//! SQLite-backed vector store.
//!
//! Vectors live as little-endian f32 blobs beside their JSON metadata;
//! search is a brute-force cosine scan over one namespace.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{cosine_similarity, rank_matches, VectorMatch, VectorRecord, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::{Service, ServiceError};

pub struct SqliteVectorStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

fn store_err(err: sqlx::Error) -> ServiceError {
    ServiceError::unavailable(Service::VectorStore, err)
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ServiceError> {
        Self::with_path(paths.vector_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ServiceError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), ServiceError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vectors (
                namespace TEXT NOT NULL,
                id TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (namespace, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vector_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    /// Remember which embedding model filled the store. Returns the model
    /// previously recorded when it differs from `model`.
    pub async fn record_embedding_model(&self, model: &str) -> Result<Option<String>, ServiceError> {
        let previous: Option<String> =
            sqlx::query_scalar("SELECT value FROM vector_meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;

        sqlx::query(
            "INSERT OR REPLACE INTO vector_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(model)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(previous.filter(|prev| prev != model))
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), ServiceError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        for record in &records {
            let blob = Self::serialize_embedding(&record.vector);
            let metadata = serde_json::to_string(&record.metadata)
                .map_err(|e| ServiceError::Persistence(e.to_string()))?;

            sqlx::query(
                "INSERT OR REPLACE INTO vectors (namespace, id, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(namespace)
            .bind(&record.id)
            .bind(&metadata)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn exists(&self, namespace: &str, id: &str) -> Result<bool, ServiceError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM vectors WHERE namespace = ?1 AND id = ?2")
                .bind(namespace)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        Ok(found.is_some())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ServiceError> {
        let rows = sqlx::query(
            "SELECT id, metadata, embedding
             FROM vectors
             WHERE namespace = ?1",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let scored: Vec<VectorMatch> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let metadata_str: String = row.get("metadata");

                Some(VectorMatch {
                    id: row.get("id"),
                    score: cosine_similarity(vector, &stored),
                    metadata: serde_json::from_str::<Value>(&metadata_str).unwrap_or(Value::Null),
                })
            })
            .collect();

        Ok(rank_matches(scored, top_k))
    }

    async fn count(&self, namespace: &str) -> Result<usize, ServiceError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors WHERE namespace = ?1")
            .bind(namespace)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(count as usize)
    }
}
