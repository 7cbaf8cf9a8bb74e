//! Scripted collaborators shared by the unit test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::errors::{Service, ServiceError};
use crate::llm::{ChatRequest, LlmProvider, LlmService, LlmSettings, LlmTask};
use crate::rag::EmbeddingClient;
use crate::tools::search::{SearchResult, WebSearch};

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// LLM fake answering by task. Unscripted tasks fail as unavailable.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<HashMap<LlmTask, Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, task: LlmTask, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(task, Reply::Text(text.to_string()));
        self
    }

    pub fn fail(self, task: LlmTask) -> Self {
        self.replies.lock().unwrap().insert(task, Reply::Fail);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn calls_for(&self, task: LlmTask) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.task == task)
            .count()
    }

    pub fn tasks(&self) -> Vec<LlmTask> {
        self.requests.lock().unwrap().iter().map(|r| r.task).collect()
    }

    /// Last request issued for `task`.
    pub fn last_request(&self, task: LlmTask) -> Option<ChatRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.task == task)
            .cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, ServiceError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ServiceError> {
        let task = request.task;
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().get(&task).cloned();
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail) => Err(ServiceError::unavailable(Service::Llm, "scripted failure")),
            None => Err(ServiceError::unavailable(
                Service::Llm,
                format!("no reply scripted for {}", task),
            )),
        }
    }
}

pub fn llm_service(provider: Arc<ScriptedLlm>) -> LlmService {
    let mut settings = LlmSettings::default();
    settings.timeout = Duration::from_secs(5);
    LlmService::new(provider, settings)
}

/// Web search fake with per-query results and a default for everything else.
#[derive(Default)]
pub struct FakeWebSearch {
    default: Vec<SearchResult>,
    by_query: HashMap<String, Vec<SearchResult>>,
    failing: bool,
    queries: Mutex<Vec<(String, usize)>>,
}

impl FakeWebSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(bodies: &[&str]) -> Self {
        Self {
            default: bodies.iter().map(|b| web_result(b)).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn for_query(mut self, query: &str, bodies: &[&str]) -> Self {
        self.by_query
            .insert(query.to_string(), bodies.iter().map(|b| web_result(b)).collect());
        self
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

fn web_result(body: &str) -> SearchResult {
    SearchResult {
        title: body.split('.').next().unwrap_or(body).to_string(),
        url: "https://example.com/wiki".to_string(),
        body: body.to_string(),
    }
}

#[async_trait]
impl WebSearch for FakeWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ServiceError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        if self.failing {
            return Err(ServiceError::unavailable(Service::WebSearch, "offline"));
        }
        let mut results = self
            .by_query
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default.clone());
        results.truncate(max_results);
        Ok(results)
    }
}

/// Deterministic embedder: lowercase words hashed into a small
/// bag-of-words vector, so texts sharing words are close.
#[derive(Default)]
pub struct BagOfWordsEmbedder {
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
    failing: bool,
}

const EMBEDDING_DIM: usize = 64;

impl BagOfWordsEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
                });
            vector[(hash % EMBEDDING_DIM as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for BagOfWordsEmbedder {
    fn model(&self) -> &str {
        "bag-of-words"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().extend(texts.iter().cloned());
        if self.failing {
            return Err(ServiceError::unavailable(Service::Embedding, "offline"));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}
