use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::errors::{call_with_timeout, Service, ServiceError};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatRequest, LlmSettings};

/// Upper bound on completions issued while answering one question:
/// expansion, strategy, relevance, reasoning, sufficiency, sub-queries,
/// synthesis, validation or scoring, refinement.
pub const MAX_LLM_CALLS: usize = 9;

#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    settings: LlmSettings,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: LlmSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await.unwrap_or(false)
    }

    /// Send one completion with the task's profile applied and the
    /// configured deadline enforced.
    pub async fn complete(&self, request: ChatRequest) -> Result<String, ServiceError> {
        let task = request.task;
        let request = request.with_profile(&self.settings.profile(task));

        tracing::debug!(
            task = %task,
            model = request.model.as_deref().unwrap_or_default(),
            prompt_chars = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "llm request"
        );

        let result = call_with_timeout(
            Service::Llm,
            self.settings.timeout,
            self.provider.chat(request),
        )
        .await;

        match &result {
            Ok(text) => tracing::debug!(task = %task, response_chars = text.len(), "llm response"),
            Err(err) => tracing::warn!(task = %task, "llm call failed: {}", err),
        }
        result
    }

    /// Start a request-scoped session that refuses calls past
    /// [`MAX_LLM_CALLS`].
    pub fn session(&self) -> LlmSession<'_> {
        LlmSession::with_budget(self, MAX_LLM_CALLS)
    }
}

/// Call-counting view of [`LlmService`] for a single pipeline run.
pub struct LlmSession<'a> {
    service: &'a LlmService,
    calls: AtomicUsize,
    budget: usize,
}

impl<'a> LlmSession<'a> {
    pub fn with_budget(service: &'a LlmService, budget: usize) -> Self {
        Self {
            service,
            calls: AtomicUsize::new(0),
            budget,
        }
    }

    pub async fn complete(&self, request: ChatRequest) -> Result<String, ServiceError> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if previous >= self.budget {
            self.calls.fetch_sub(1, Ordering::SeqCst);
            return Err(ServiceError::unavailable(
                Service::Llm,
                format!("call budget of {} exhausted at {}", self.budget, request.task),
            ));
        }
        self.service.complete(request).await
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
