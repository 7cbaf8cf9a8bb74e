//! Retrieval storage and ingestion.
//!
//! - `VectorStore`: namespaced vector storage (SQLite or in-memory)
//! - `EmbeddingClient`: text to vectors
//! - `IngestService`: chunking and content-hash deduplication of documents

pub mod embedder;
pub mod extract;
pub mod ingest;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use embedder::{EmbeddingClient, EmbeddingSettings, OpenAiEmbeddingClient};
pub use extract::DocumentKind;
pub use ingest::{IngestReport, IngestService, IngestSettings};
pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;
pub use store::{VectorMatch, VectorRecord, VectorStore};
