//! Document ingestion: chunk, hash, deduplicate, embed, upsert.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::embedder::EmbeddingClient;
use super::extract::DocumentKind;
use super::store::{VectorRecord, VectorStore};
use crate::core::config::get_u64;
use crate::core::errors::{Service, ServiceError};

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub chunk_words: usize,
    pub chunk_overlap_words: usize,
    pub fetch_timeout: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_words: 150,
            chunk_overlap_words: 20,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl IngestSettings {
    pub fn from_config(config: &Value) -> Self {
        let mut settings = Self::default();
        if let Some(words) = get_u64(config, "ingest.chunk_words") {
            settings.chunk_words = words as usize;
        }
        if let Some(overlap) = get_u64(config, "ingest.chunk_overlap_words") {
            settings.chunk_overlap_words = overlap as usize;
        }
        if let Some(secs) = get_u64(config, "ingest.fetch_timeout_secs") {
            settings.fetch_timeout = Duration::from_secs(secs);
        }
        settings
    }

    /// Chunk count reported in upload acknowledgements, before processing.
    pub fn estimate_chunks(&self, text: &str) -> usize {
        (text.split_whitespace().count() / self.chunk_words.max(1)).max(1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub total_chunks: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Collapse every whitespace run (newlines included) into one space.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex SHA-256 of the cleaned text; the id of a document chunk.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Word windows of `chunk_words`, each starting `chunk_words - overlap`
/// words after the previous one.
pub fn split_into_chunks(text: &str, chunk_words: usize, overlap_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let size = chunk_words.max(1);
    let step = size.saturating_sub(overlap_words).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + size).min(words.len());
        let chunk = clean_text(&words[start..end].join(" "));
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[derive(Clone)]
pub struct IngestService {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    namespace: String,
    settings: IngestSettings,
}

impl IngestService {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        namespace: impl Into<String>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            namespace: namespace.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Index `content` under content-hash ids. Chunks already stored, or
    /// repeated inside this batch, are skipped without being embedded.
    pub async fn ingest_text(
        &self,
        content: &str,
        file_name: &str,
        kind: DocumentKind,
    ) -> Result<IngestReport, ServiceError> {
        let chunks = split_into_chunks(
            content,
            self.settings.chunk_words,
            self.settings.chunk_overlap_words,
        );
        let mut report = IngestReport {
            total_chunks: chunks.len(),
            ..IngestReport::default()
        };

        let mut seen = HashSet::new();
        let mut fresh: Vec<(String, String)> = Vec::new();
        for chunk in chunks {
            let id = content_hash(&chunk);
            if !seen.insert(id.clone()) || self.store.exists(&self.namespace, &id).await? {
                report.skipped += 1;
                continue;
            }
            fresh.push((id, chunk));
        }

        if fresh.is_empty() {
            tracing::info!("No new content to insert from {}", file_name);
            return Ok(report);
        }

        let texts: Vec<String> = fresh.iter().map(|(_, text)| text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != fresh.len() {
            return Err(ServiceError::malformed(
                Service::Embedding,
                format!("expected {} embeddings, got {}", fresh.len(), vectors.len()),
            ));
        }

        let records: Vec<VectorRecord> = fresh
            .into_iter()
            .zip(vectors)
            .map(|((id, text), vector)| {
                VectorRecord::new(
                    id,
                    vector,
                    json!({
                        "source_text": text,
                        "file_name": file_name,
                        "file_type": kind.as_str(),
                    }),
                )
            })
            .collect();

        report.inserted = records.len();
        self.store.upsert(&self.namespace, records).await?;

        tracing::info!(
            "{} new chunks from {} inserted into {} ({} skipped)",
            report.inserted,
            file_name,
            self.namespace,
            report.skipped
        );
        Ok(report)
    }

    /// Run [`Self::ingest_text`] on a background task; failures are only logged.
    pub fn spawn_ingest(&self, content: String, file_name: String, kind: DocumentKind) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(err) = service.ingest_text(&content, &file_name, kind).await {
                tracing::error!("Ingestion of {} failed: {}", file_name, err);
            }
        });
    }
}
