use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::core::errors::{Service, ServiceError};
use crate::rag::{EmbeddingClient, VectorRecord, VectorStore};

/// Writes answered questions back into the store so later retrievals can
/// reuse them.
#[derive(Clone)]
pub struct InteractionStore {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    namespace: String,
}

impl InteractionStore {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            namespace: namespace.into(),
        }
    }

    /// Store the pair as `{id}_question` and `{id}_response` in one upsert.
    /// Returns the shared root id.
    pub async fn record(&self, question: &str, answer: &str) -> Result<String, ServiceError> {
        let vectors = self
            .embedder
            .embed(&[question.to_string(), answer.to_string()])
            .await?;
        let [question_vector, answer_vector]: [Vec<f32>; 2] = vectors.try_into().map_err(|v: Vec<Vec<f32>>| {
            ServiceError::malformed(Service::Embedding, format!("expected 2 embeddings, got {}", v.len()))
        })?;

        let root = Uuid::new_v4().to_string();
        let records = vec![
            VectorRecord::new(
                format!("{}_question", root),
                question_vector,
                json!({ "question": question, "answer": answer, "type": "question" }),
            ),
            VectorRecord::new(
                format!("{}_response", root),
                answer_vector,
                json!({ "question": question, "answer": answer, "type": "response" }),
            ),
        ];

        self.store
            .upsert(&self.namespace, records)
            .await
            .map_err(|err| ServiceError::Persistence(err.to_string()))?;

        tracing::info!("Stored interaction {} in {}", root, self.namespace);
        Ok(root)
    }
}
