use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatRequest, LlmSettings};
use crate::core::errors::{Service, ServiceError};

/// Chat-completions client for OpenAI and any server exposing the same API
/// (LM Studio, Ollama's `/v1`, vLLM).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(settings.base_url.clone(), settings.api_key.clone())
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn is_local(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ServiceError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self.authorized(self.client.get(&url)).send().await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ServiceError> {
        if self.api_key.is_none() && !self.is_local() {
            return Err(ServiceError::unavailable(
                Service::Llm,
                "no API key configured (llm.api_key or OPENAI_API_KEY)",
            ));
        }

        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = chat_body(&request);

        let res = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::unavailable(Service::Llm, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ServiceError::unavailable(
                Service::Llm,
                format!("chat error {}: {}", status, text),
            ));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| ServiceError::unavailable(Service::Llm, e))?;

        extract_message_content(&payload)
    }
}

fn extract_message_content(payload: &Value) -> Result<String, ServiceError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ServiceError::malformed(Service::Llm, payload.to_string()))
}

/// OpenAI chat payload; unset profile fields are left to the server.
fn chat_body(request: &ChatRequest) -> Value {
    let mut body = json!({
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(model) = &request.model {
            obj.insert("model".to_string(), json!(model));
        }
        if let Some(temperature) = request.temperature {
            obj.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            obj.insert("max_tokens".to_string(), json!(max_tokens));
        }
    }
    body
}
