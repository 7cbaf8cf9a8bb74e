//! In-process vector store used when `vector_store.backend` is `memory`
//! and by the pipeline tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{cosine_similarity, rank_matches, VectorMatch, VectorRecord, VectorStore};
use crate::core::errors::ServiceError;

#[derive(Default)]
pub struct InMemoryVectorStore {
    namespaces: RwLock<HashMap<String, HashMap<String, VectorRecord>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), ServiceError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn exists(&self, namespace: &str, id: &str) -> Result<bool, ServiceError> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .map(|entries| entries.contains_key(id))
            .unwrap_or(false))
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ServiceError> {
        let namespaces = self.namespaces.read().await;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let scored = entries
            .values()
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.vector),
                metadata: record.metadata.clone(),
            })
            .collect();

        Ok(rank_matches(scored, top_k))
    }

    async fn count(&self, namespace: &str) -> Result<usize, ServiceError> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces.get(namespace).map(HashMap::len).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_overwrites_same_id() {
        let store = InMemoryVectorStore::new();
        store
            .upsert("docs", vec![VectorRecord::new("a", vec![1.0, 0.0], json!({ "v": 1 }))])
            .await
            .unwrap();
        store
            .upsert("docs", vec![VectorRecord::new("a", vec![0.0, 1.0], json!({ "v": 2 }))])
            .await
            .unwrap();

        assert_eq!(store.count("docs").await.unwrap(), 1);
        let hits = store.query("docs", &[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits[0].metadata["v"], json!(2));
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryVectorStore::new();
        store
            .upsert("a", vec![VectorRecord::new("only-in-a", vec![1.0, 0.0], json!({}))])
            .await
            .unwrap();

        assert!(store.exists("a", "only-in-a").await.unwrap());
        assert!(!store.exists("b", "only-in-a").await.unwrap());
        assert!(store.query("b", &[1.0, 0.0], 10).await.unwrap().is_empty());
        assert_eq!(store.count("b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_and_truncates() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(
                "docs",
                vec![
                    VectorRecord::new("far", vec![0.0, 1.0], json!({})),
                    VectorRecord::new("near", vec![1.0, 0.1], json!({})),
                    VectorRecord::new("mid", vec![1.0, 1.0], json!({})),
                ],
            )
            .await
            .unwrap();

        let hits = store.query("docs", &[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
    }
}
