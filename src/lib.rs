//! Game Q&A assistant backend: document ingestion, adaptive local/web
//! retrieval and LLM answer synthesis behind a small HTTP API.

pub mod core;
pub mod llm;
pub mod pipeline;
pub mod rag;
pub mod server;
pub mod state;
pub mod tools;

#[cfg(test)]
mod testing;
