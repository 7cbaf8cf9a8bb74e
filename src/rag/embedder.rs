use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::{get_str, get_u64};
use crate::core::errors::{call_with_timeout, Service, ServiceError};

/// Converts text into fixed-length vectors, one per input, in input order.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    fn model(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingSettings {
    /// Reads `embedding.*`; the key falls back to `llm.api_key` and then
    /// `OPENAI_API_KEY`.
    pub fn from_config(config: &Value) -> Self {
        let mut settings = Self::default();
        if let Some(url) = get_str(config, "embedding.base_url") {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get_str(config, "embedding.model") {
            settings.model = model.to_string();
        }
        settings.api_key = get_str(config, "embedding.api_key")
            .or_else(|| get_str(config, "llm.api_key"))
            .map(str::to_string)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());
        if let Some(secs) = get_u64(config, "embedding.timeout_secs") {
            settings.timeout = Duration::from_secs(secs);
        }
        settings
    }
}

/// Client for `POST {base_url}/v1/embeddings`.
pub struct OpenAiEmbeddingClient {
    settings: EmbeddingSettings,
    client: Client,
}

impl OpenAiEmbeddingClient {
    pub fn new(settings: EmbeddingSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let Some(api_key) = &self.settings.api_key else {
            return Err(ServiceError::unavailable(
                Service::Embedding,
                "no API key configured (embedding.api_key or OPENAI_API_KEY)",
            ));
        };

        let url = format!("{}/v1/embeddings", self.settings.base_url);
        let body = json!({
            "model": self.settings.model,
            "input": texts,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::unavailable(Service::Embedding, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ServiceError::unavailable(
                Service::Embedding,
                format!("embedding error {}: {}", status, text),
            ));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ServiceError::unavailable(Service::Embedding, e))?;

        parse_embeddings(&payload, texts.len())
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        call_with_timeout(Service::Embedding, self.settings.timeout, self.request(texts)).await
    }
}

/// Pull `data[].embedding` out of a response, ordered by each item's
/// `index` so vectors line up with the inputs.
fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ServiceError> {
    let malformed = || ServiceError::malformed(Service::Embedding, truncate_raw(payload));

    let data = payload["data"].as_array().ok_or_else(malformed)?;
    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        let vector = item["embedding"]
            .as_array()
            .ok_or_else(malformed)?
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(malformed)?;
        indexed.push((index, vector));
    }

    if indexed.len() != expected {
        return Err(ServiceError::malformed(
            Service::Embedding,
            format!("expected {} embeddings, got {}", expected, indexed.len()),
        ));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

fn truncate_raw(payload: &Value) -> String {
    let raw = payload.to_string();
    raw.chars().take(200).collect()
}
