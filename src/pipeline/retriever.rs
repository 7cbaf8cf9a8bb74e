use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::expander::{expand, expanded_query};
use crate::core::errors::{Service, ServiceError};
use crate::llm::LlmSession;
use crate::rag::{EmbeddingClient, VectorMatch, VectorStore};

/// Embeds a query once and collects the nearest stored passages from each
/// namespace, in the caller's namespace order.
#[derive(Clone)]
pub struct ContextRetriever {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
}

impl ContextRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Expand `question`, then retrieve with the merged query string.
    pub async fn retrieve_expanded(
        &self,
        llm: &LlmSession<'_>,
        question: &str,
        namespaces: &[&str],
        top_k: usize,
    ) -> Result<String, ServiceError> {
        let variations = expand(llm, question).await;
        self.retrieve(&expanded_query(question, &variations), namespaces, top_k)
            .await
    }

    /// Context string for `query`; empty when nothing matched.
    pub async fn retrieve(
        &self,
        query: &str,
        namespaces: &[&str],
        top_k: usize,
    ) -> Result<String, ServiceError> {
        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::malformed(Service::Embedding, "no vector returned"))?;

        let mut matches = Vec::new();
        for namespace in namespaces {
            matches.extend(self.store.query(namespace, &vector, top_k).await?);
        }

        tracing::debug!(
            matches = matches.len(),
            namespaces = namespaces.len(),
            "local retrieval"
        );
        Ok(format_matches(&matches))
    }
}

fn non_empty<'a>(metadata: &'a Value, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Text for one match: a document chunk's `source_text`, or a stored
/// interaction rendered as question and answer.
pub fn render_match(metadata: &Value) -> Option<String> {
    if let Some(text) = non_empty(metadata, "source_text") {
        return Some(text.to_string());
    }
    match (non_empty(metadata, "question"), non_empty(metadata, "answer")) {
        (Some(q), Some(a)) => Some(format!("Question: {}\nAnswer: {}", q, a)),
        (Some(q), None) => Some(format!("Related question: {}", q)),
        (None, Some(a)) => Some(format!("Related answer: {}", a)),
        (None, None) => None,
    }
}

/// Render matches in order, skipping unrenderable and repeated passages,
/// separated by blank lines.
pub fn format_matches(matches: &[VectorMatch]) -> String {
    let mut seen = HashSet::new();
    matches
        .iter()
        .filter_map(|m| render_match(&m.metadata))
        .filter(|text| seen.insert(text.clone()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: &str, metadata: Value) -> VectorMatch {
        VectorMatch {
            id: id.to_string(),
            score: 0.5,
            metadata,
        }
    }

    #[test]
    fn renders_documents_and_interactions() {
        assert_eq!(
            render_match(&json!({ "source_text": "Torrent is summoned with the whistle." })),
            Some("Torrent is summoned with the whistle.".to_string())
        );
        assert_eq!(
            render_match(&json!({ "question": "Where is Ranni?", "answer": "Ranni's Rise.", "type": "question" })),
            Some("Question: Where is Ranni?\nAnswer: Ranni's Rise.".to_string())
        );
        assert_eq!(render_match(&json!({ "file_name": "guide.pdf" })), None);
        assert_eq!(render_match(&json!({ "source_text": "   " })), None);
    }

    #[test]
    fn format_keeps_order_and_drops_repeats() {
        let pair = json!({ "question": "q", "answer": "a" });
        let matches = vec![
            hit("doc", json!({ "source_text": "first" })),
            hit("x_question", pair.clone()),
            hit("meta-only", json!({ "file_type": "pdf" })),
            hit("x_response", pair),
            hit("doc2", json!({ "source_text": "last" })),
        ];
        assert_eq!(format_matches(&matches), "first\n\nQuestion: q\nAnswer: a\n\nlast");
        assert_eq!(format_matches(&[]), "");
    }
}
