//! Adaptive answer pipeline: strategy, context gathering, synthesis,
//! quality control and persistence for one question.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;

use super::decider::decide;
use super::interactions::InteractionStore;
use super::quality::{self, QualityPolicy};
use super::reasoning::{analyze, generate_sub_queries, needs_more_information};
use super::retriever::ContextRetriever;
use super::strategy::{select_strategy, Strategy, StrategyMode};
use super::synthesizer::synthesize;
use crate::core::config::{get_bool, get_str, get_u64};
use crate::core::errors::{ApiError, ServiceError};
use crate::llm::{LlmService, LlmSession, MAX_LLM_CALLS};
use crate::rag::{EmbeddingClient, VectorStore};
use crate::tools::search::{format_results, WebSearch};

/// External services the pipeline talks to, built once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub llm: LlmService,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub store: Arc<dyn VectorStore>,
    pub web: Arc<dyn WebSearch>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub strategy: StrategyMode,
    pub reasoning: bool,
    pub sufficiency_check: bool,
    pub quality_policy: QualityPolicy,
    pub top_k: usize,
    pub sub_query_top_k: usize,
    pub web_max_results: usize,
    pub hybrid_web_max_results: usize,
    /// Local context shorter than this many characters counts as thin and
    /// sends a sub-query to the web.
    pub thin_context_chars: usize,
    /// Scores below this trigger one refinement pass.
    pub refine_threshold: u8,
    pub max_context_chars: usize,
    pub documents_namespace: String,
    pub interactions_namespace: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            strategy: StrategyMode::Adaptive,
            reasoning: true,
            sufficiency_check: true,
            quality_policy: QualityPolicy::ScoredRefinement,
            top_k: 3,
            sub_query_top_k: 2,
            web_max_results: 5,
            hybrid_web_max_results: 3,
            thin_context_chars: 100,
            refine_threshold: quality::DEFAULT_QUALITY_SCORE,
            max_context_chars: 12_000,
            documents_namespace: "game_docs".to_string(),
            interactions_namespace: "game_queries".to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Value) -> Self {
        let mut options = Self::default();
        let usize_at = |path: &str| get_u64(config, path).map(|v| v as usize);

        if let Some(mode) = get_str(config, "pipeline.strategy").and_then(StrategyMode::from_name) {
            options.strategy = mode;
        }
        if let Some(policy) =
            get_str(config, "pipeline.quality_policy").and_then(QualityPolicy::from_name)
        {
            options.quality_policy = policy;
        }
        if let Some(v) = get_bool(config, "pipeline.reasoning") {
            options.reasoning = v;
        }
        if let Some(v) = get_bool(config, "pipeline.sufficiency_check") {
            options.sufficiency_check = v;
        }
        if let Some(v) = usize_at("pipeline.top_k") {
            options.top_k = v;
        }
        if let Some(v) = usize_at("pipeline.sub_query_top_k") {
            options.sub_query_top_k = v;
        }
        if let Some(v) = usize_at("pipeline.web_max_results") {
            options.web_max_results = v;
        }
        if let Some(v) = usize_at("pipeline.hybrid_web_max_results") {
            options.hybrid_web_max_results = v;
        }
        if let Some(v) = usize_at("pipeline.thin_context_chars") {
            options.thin_context_chars = v;
        }
        if let Some(v) = get_u64(config, "pipeline.refine_threshold") {
            options.refine_threshold = v.clamp(1, 10) as u8;
        }
        if let Some(v) = usize_at("pipeline.max_context_chars") {
            options.max_context_chars = v;
        }
        if let Some(ns) = get_str(config, "vector_store.documents_namespace") {
            options.documents_namespace = ns.to_string();
        }
        if let Some(ns) = get_str(config, "vector_store.interactions_namespace") {
            options.interactions_namespace = ns.to_string();
        }
        options
    }
}

/// `"{question} in {game}"` when a game is named. Blank questions are rejected.
pub fn compose_question(question: &str, game_name: Option<&str>) -> Result<String, ApiError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question text must not be empty".to_string()));
    }
    match game_name.map(str::trim).filter(|g| !g.is_empty()) {
        Some(game) => Ok(format!("{} in {}", question, game)),
        None => Ok(question.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct AnswerRequest {
    question: String,
}

impl AnswerRequest {
    pub fn new(question: &str, game_name: Option<&str>) -> Result<Self, ApiError> {
        Ok(Self {
            question: compose_question(question, game_name)?,
        })
    }

    /// The composed question, game name included.
    pub fn question(&self) -> &str {
        &self.question
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    StrategySelected,
    ContextGathered,
    AnswerSynthesized,
    Validated,
    Refined,
    Persisted,
    Done,
}

/// What happened while answering one question.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineTrace {
    pub stages: Vec<PipelineStage>,
    pub llm_calls: usize,
    /// Relevance verdict on local context (local-first only).
    pub local_sufficient: Option<bool>,
    pub sub_queries: usize,
    pub context_chars: usize,
    /// Binary validation verdict, `None` when not run or unreadable.
    pub validation: Option<bool>,
    pub refined: bool,
    pub persisted: bool,
}

impl PipelineTrace {
    fn enter(&mut self, stage: PipelineStage) {
        tracing::info!(stage = ?stage, "pipeline stage");
        self.stages.push(stage);
    }
}

#[derive(Debug, Clone)]
pub struct AnswerResponse {
    pub answer: String,
    pub elapsed: Duration,
    pub quality_score: Option<u8>,
    pub strategy: Strategy,
    pub trace: PipelineTrace,
}

/// Non-empty parts joined by blank lines, in the given order.
fn join_context(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_context(context: &mut String, max_chars: usize) {
    if let Some((cut, _)) = context.char_indices().nth(max_chars) {
        tracing::debug!(from = context.len(), to = cut, "truncating context");
        context.truncate(cut);
    }
}

pub struct AnswerPipeline {
    llm: LlmService,
    web: Arc<dyn WebSearch>,
    retriever: ContextRetriever,
    interactions: InteractionStore,
    options: PipelineOptions,
}

impl AnswerPipeline {
    pub fn new(collaborators: Collaborators, options: PipelineOptions) -> Self {
        let Collaborators {
            llm,
            embedder,
            store,
            web,
        } = collaborators;
        Self {
            llm,
            web,
            retriever: ContextRetriever::new(embedder.clone(), store.clone()),
            interactions: InteractionStore::new(embedder, store, options.interactions_namespace.clone()),
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub async fn answer(&self, request: AnswerRequest) -> Result<AnswerResponse, ServiceError> {
        let started = Instant::now();
        let llm = self.llm.session();
        let question = request.question();
        let mut trace = PipelineTrace::default();
        trace.enter(PipelineStage::Start);
        tracing::info!("Answering question: {}", question);

        let strategy = match self.options.strategy {
            StrategyMode::Adaptive => select_strategy(&llm, question).await,
            StrategyMode::Fixed(strategy) => strategy,
        };
        tracing::info!("Selected search strategy: {}", strategy);
        trace.enter(PipelineStage::StrategySelected);

        let mut context = self.gather_context(&llm, question, strategy, &mut trace).await;
        truncate_context(&mut context, self.options.max_context_chars);
        trace.enter(PipelineStage::ContextGathered);

        let reasoning = if self.options.reasoning {
            analyze(&llm, question, &context).await
        } else {
            None
        };
        let reasoning = reasoning.unwrap_or_default();

        if self.options.sufficiency_check
            && needs_more_information(&llm, question, &context, &reasoning).await
        {
            tracing::info!("More information needed, generating sub-queries");
            let sub_queries = generate_sub_queries(&llm, question, &reasoning).await;
            trace.sub_queries = sub_queries.len();
            let additional = self.gather_additional_context(&sub_queries).await;
            context = join_context(&[&context, &additional]);
            truncate_context(&mut context, self.options.max_context_chars);
        }
        trace.context_chars = context.chars().count();

        let mut answer = match synthesize(&llm, &context, question).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!("Answer synthesis failed: {}", err);
                return Err(err);
            }
        };
        trace.enter(PipelineStage::AnswerSynthesized);

        let mut quality_score = None;
        let mut persist = true;
        match self.options.quality_policy {
            QualityPolicy::BinaryValidation => {
                let verdict = quality::validate(&llm, &answer, &context).await;
                match verdict {
                    Some(true) => tracing::info!("Response is validated with context"),
                    Some(false) => {
                        tracing::warn!("Response validation failed, answer will not be stored");
                        persist = false;
                    }
                    None => tracing::warn!("Response validation inconclusive"),
                }
                trace.validation = verdict;
                trace.enter(PipelineStage::Validated);
            }
            QualityPolicy::ScoredRefinement => {
                let score = quality::score(&llm, &answer, &context, question).await;
                tracing::info!("Response confidence score: {}/10", score);
                quality_score = Some(score);
                trace.enter(PipelineStage::Validated);

                if score < self.options.refine_threshold {
                    tracing::info!("Refining response below threshold {}", self.options.refine_threshold);
                    if let Some(refined) =
                        quality::refine(&llm, &answer, &context, question, &reasoning).await
                    {
                        answer = refined;
                        trace.refined = true;
                        trace.enter(PipelineStage::Refined);
                    }
                }
            }
        }

        if persist {
            match self.interactions.record(question, &answer).await {
                Ok(_) => {
                    trace.persisted = true;
                    trace.enter(PipelineStage::Persisted);
                }
                Err(err) => tracing::warn!("Failed to store interaction: {}", err),
            }
        }

        trace.llm_calls = llm.calls();
        debug_assert!(trace.llm_calls <= MAX_LLM_CALLS);
        trace.enter(PipelineStage::Done);

        let elapsed = started.elapsed();
        tracing::info!(
            strategy = %strategy,
            llm_calls = trace.llm_calls,
            context_chars = trace.context_chars,
            refined = trace.refined,
            persisted = trace.persisted,
            "Answered in {:?}",
            elapsed
        );

        Ok(AnswerResponse {
            answer,
            elapsed,
            quality_score,
            strategy,
            trace,
        })
    }

    fn namespaces(&self) -> [&str; 2] {
        [
            self.options.documents_namespace.as_str(),
            self.options.interactions_namespace.as_str(),
        ]
    }

    async fn gather_context(
        &self,
        llm: &LlmSession<'_>,
        question: &str,
        strategy: Strategy,
        trace: &mut PipelineTrace,
    ) -> String {
        match strategy {
            Strategy::LocalFirst => {
                let local = self.local_context(llm, question).await;
                let sufficient = decide(llm, &local, question).await;
                trace.local_sufficient = Some(sufficient);
                if sufficient {
                    tracing::info!("Local context can answer the question");
                    local
                } else {
                    tracing::info!("Local context insufficient, switching to web search");
                    self.web_context(question, self.options.web_max_results).await
                }
            }
            Strategy::WebFirst => {
                let web = self.web_context(question, self.options.web_max_results).await;
                if web.trim().is_empty() {
                    tracing::info!("Web search yielded no results, trying local store");
                    self.local_context(llm, question).await
                } else {
                    web
                }
            }
            Strategy::Hybrid => {
                let (local, web) = tokio::join!(
                    self.local_context(llm, question),
                    self.web_context(question, self.options.hybrid_web_max_results)
                );
                join_context(&[&local, &web])
            }
        }
    }

    async fn local_context(&self, llm: &LlmSession<'_>, question: &str) -> String {
        self.retriever
            .retrieve_expanded(llm, question, &self.namespaces(), self.options.top_k)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!("Local retrieval failed, continuing with empty context: {}", err);
                String::new()
            })
    }

    async fn web_context(&self, query: &str, max_results: usize) -> String {
        match self.web.search(query, max_results).await {
            Ok(results) => format_results(&results),
            Err(err) => {
                tracing::warn!("Web search failed for {:?}: {}", query, err);
                String::new()
            }
        }
    }

    /// Local retrieval per sub-query without expansion; thin results are
    /// replaced by a web search. Merged in sub-query order.
    async fn gather_additional_context(&self, sub_queries: &[String]) -> String {
        let namespaces = self.namespaces();
        let lookups = sub_queries.iter().map(|query| async move {
            let local = self
                .retriever
                .retrieve(query, &namespaces, self.options.sub_query_top_k)
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!("Sub-query retrieval failed for {:?}: {}", query, err);
                    String::new()
                });
            if local.chars().count() < self.options.thin_context_chars {
                self.web_context(query, self.options.web_max_results).await
            } else {
                local
            }
        });

        let parts = join_all(lookups).await;
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        join_context(&refs)
    }
}
