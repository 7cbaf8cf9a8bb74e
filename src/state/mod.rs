use std::sync::Arc;

use crate::core::config::{get_str, AppPaths, ConfigService};
use crate::llm::{LlmService, LlmSettings, OpenAiCompatibleProvider};
use crate::pipeline::{AnswerPipeline, Collaborators, PipelineOptions};
use crate::rag::{
    EmbeddingClient, EmbeddingSettings, InMemoryVectorStore, IngestService, IngestSettings,
    OpenAiEmbeddingClient, SqliteVectorStore, VectorStore,
};
use crate::tools::search::{HttpWebSearch, SearchSettings};

pub mod error;

use error::InitializationError;

/// Application state shared by every route.
///
/// Holds the configuration, the answer pipeline, the ingestion service and
/// the vector store backing both of them.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub llm: LlmService,
    pub store: Arc<dyn VectorStore>,
    pub pipeline: Arc<AnswerPipeline>,
    pub ingest: IngestService,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Setting up paths and loading configuration
    /// 2. Opening the vector store
    /// 3. Building the LLM, embedding and web search clients
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let config_value = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let llm_settings = LlmSettings::from_config(&config_value);
        let provider = Arc::new(OpenAiCompatibleProvider::from_settings(&llm_settings));
        let llm = LlmService::new(provider, llm_settings);

        let embedder: Arc<dyn EmbeddingClient> = Arc::new(OpenAiEmbeddingClient::new(
            EmbeddingSettings::from_config(&config_value),
        ));

        let store: Arc<dyn VectorStore> = match get_str(&config_value, "vector_store.backend") {
            Some("memory") => {
                tracing::warn!("Using in-memory vector store; data is lost on exit");
                Arc::new(InMemoryVectorStore::new())
            }
            _ => {
                let sqlite = SqliteVectorStore::new(paths.as_ref())
                    .await
                    .map_err(|e| InitializationError::VectorStore(e.into()))?;
                match sqlite.record_embedding_model(embedder.model()).await {
                    Ok(Some(previous)) => tracing::warn!(
                        "Embedding model changed from {} to {}; existing vectors may not be comparable",
                        previous,
                        embedder.model()
                    ),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Failed to record embedding model: {}", e),
                }
                Arc::new(sqlite)
            }
        };

        let web = Arc::new(HttpWebSearch::new(SearchSettings::from_config(&config_value)));

        let collaborators = Collaborators {
            llm,
            embedder,
            store,
            web,
        };

        Ok(Self::from_parts(
            paths,
            config,
            collaborators,
            PipelineOptions::from_config(&config_value),
            IngestSettings::from_config(&config_value),
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        collaborators: Collaborators,
        options: PipelineOptions,
        ingest_settings: IngestSettings,
    ) -> Arc<Self> {
        let ingest = IngestService::new(
            collaborators.embedder.clone(),
            collaborators.store.clone(),
            options.documents_namespace.clone(),
            ingest_settings,
        );
        let llm = collaborators.llm.clone();
        let store = collaborators.store.clone();
        let pipeline = Arc::new(AnswerPipeline::new(collaborators, options));

        Arc::new(AppState {
            paths,
            config,
            llm,
            store,
            pipeline,
            ingest,
        })
    }
}
